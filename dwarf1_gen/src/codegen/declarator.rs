/* C declarator synthesis
 *
 * A declarator is split into the text before and after the identifier, so
 * `prefix + name + suffix` declares `name` with the tag's type. Arrays and
 * function pointers grow the suffix; everything else only the prefix.
 */

use crate::error::CodegenError;
use crate::graph::{Node, NodeLookup};
use dwarf1_types::{Tag, TagKind, TypeRef};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Declarator {
    pub prefix: String,
    pub suffix: String,
}

impl Declarator {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /* Full declaration of `name` */
    pub fn around(&self, name: &str) -> String {
        format!("{}{}{}", self.prefix, name, self.suffix)
    }

    /* Abstract declarator, as used in parameter lists */
    pub fn abstract_text(&self) -> String {
        format!("{}{}", self.prefix.trim_end(), self.suffix)
    }
}

/* Renders declarators for the tags of one unit, resolving user types
   through every unit's tree */
pub struct DeclaratorSynth<'a> {
    lookup: &'a NodeLookup<'a>,
    unit: usize,
    annotate_params: bool,
}

impl<'a> DeclaratorSynth<'a> {
    pub fn new(lookup: &'a NodeLookup<'a>, unit: usize) -> Self {
        Self {
            lookup,
            unit,
            annotate_params: false,
        }
    }

    /* Label function pointer parameters with `/* unknownN */` */
    pub fn annotate_params(mut self, annotate: bool) -> Self {
        self.annotate_params = annotate;
        self
    }

    fn tag(&self, node: &Node) -> &'a Tag {
        node.tag(self.lookup.store())
    }

    fn resolve(&self, tag: &Tag, type_id: u32) -> Result<&'a Node, CodegenError> {
        self.lookup
            .find(self.unit, type_id)
            .ok_or(CodegenError::UnresolvedReference {
                tag_id: tag.id,
                type_id,
            })
    }

    /// Declarator for a typed node: its type followed by its own modifiers.
    pub fn synthesize(&self, node: &Node) -> Result<Declarator, CodegenError> {
        let tag = self.tag(node);
        let mut declarator = self.type_of(tag)?;
        declarator.prefix.push_str(&tag.modifier_text());
        Ok(declarator)
    }

    /* Declarator of the type a tag refers to, without the tag's modifiers */
    pub fn type_of(&self, tag: &Tag) -> Result<Declarator, CodegenError> {
        match tag.type_ref {
            TypeRef::Unset => Ok(Declarator::new("void ", "")),
            TypeRef::Builtin(builtin) if builtin.ends_in_glyph() => {
                Ok(Declarator::new(builtin.keyword(), ""))
            }
            TypeRef::Builtin(builtin) => Ok(Declarator::new(format!("{} ", builtin.keyword()), "")),
            TypeRef::User(type_id) => {
                let target = self.resolve(tag, type_id)?;
                self.structural(target)
            }
        }
    }

    fn structural(&self, node: &Node) -> Result<Declarator, CodegenError> {
        let tag = self.tag(node);
        match tag.kind {
            TagKind::ArrayType => self.array(node),
            TagKind::FunctionPointer => self.function_pointer(node),
            TagKind::PtrToMemberFunc => self.member_pointer(node),
            _ => Ok(Self::named(tag)),
        }
    }

    fn named(tag: &Tag) -> Declarator {
        let name = tag.name.clone().unwrap_or_else(|| tag.anonymous_name());
        let modifiers = tag.modifier_text();
        if modifiers.is_empty() {
            Declarator::new(format!("{} ", name), "")
        } else {
            Declarator::new(format!("{} {} ", name, modifiers.trim_end()), "")
        }
    }

    fn array(&self, node: &Node) -> Result<Declarator, CodegenError> {
        let tag = self.tag(node);
        let element = self.type_of(tag)?;

        let dims: &[i32] = if tag.is_multidim_array {
            &tag.dim_lengths
        } else {
            std::slice::from_ref(&tag.length)
        };
        let mut suffix: String = dims
            .iter()
            .map(|&length| match length {
                length if length < 0 => "[]".to_string(),
                length => format!("[{}]", length as i64 + 1),
            })
            .collect();
        suffix.push_str(&element.suffix);

        Ok(Declarator::new(element.prefix + &tag.modifier_text(), suffix))
    }

    /* Rendered parameter list of a function-like node, without parentheses */
    pub fn parameter_list(&self, node: &Node) -> Result<String, CodegenError> {
        let mut params = Vec::new();
        for (position, child) in node.children.iter().enumerate() {
            let tag = self.tag(child);
            match tag.kind {
                TagKind::Param => {
                    let declarator = self.synthesize(child)?;
                    if self.annotate_params {
                        params.push(declarator.around(&format!("/* unknown{} */", position)));
                    } else {
                        params.push(declarator.abstract_text());
                    }
                }
                TagKind::VariadicParam => params.push("...".to_string()),
                _ => {}
            }
        }
        Ok(params.join(", "))
    }

    fn function_pointer(&self, node: &Node) -> Result<Declarator, CodegenError> {
        let tag = self.tag(node);
        let returns = self.type_of(tag)?;
        let prefix = format!("{}{}(", returns.prefix, tag.modifier_text());
        let suffix = format!(")({}){}", self.parameter_list(node)?, returns.suffix);
        Ok(Declarator::new(prefix, suffix))
    }

    fn member_pointer(&self, node: &Node) -> Result<Declarator, CodegenError> {
        let tag = self.tag(node);
        let owner_id = tag.member_of_id.ok_or(CodegenError::UnsupportedConstruct {
            tag_id: tag.id,
            kind: tag.kind,
            context: "without a containing type",
        })?;
        let owner = self.tag(self.resolve(tag, owner_id)?);
        let owner_name = owner.name.clone().unwrap_or_else(|| owner.anonymous_name());

        let mut declarator = self.type_of(tag)?;
        declarator.prefix.push_str(&owner_name);
        declarator.prefix.push_str("::");
        declarator.prefix.push_str(&tag.modifier_text());
        Ok(declarator)
    }
}
