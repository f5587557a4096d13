/* Declaration emitter
 *
 * Walks one unit's tree and renders every entity as C/C++ text lines,
 * indented with tabs. Each block ends with an empty line so blocks can be
 * concatenated directly; nested blocks drop it.
 */

use super::declarator::DeclaratorSynth;
use crate::error::CodegenError;
use crate::graph::{CompilationUnit, Node, NodeLookup};
use crate::layout::anonymous_union_spans;
use dwarf1_types::{AccessLevel, Tag, TagKind, TagStore};
use tracing::trace;

type Lines = Vec<String>;

pub struct Emitter<'a> {
    lookup: &'a NodeLookup<'a>,
    units: &'a [CompilationUnit],
    unit: usize,
    synth: DeclaratorSynth<'a>,
}

fn tabs(depth: usize) -> String {
    "\t".repeat(depth)
}

fn display_name(tag: &Tag) -> String {
    tag.name.clone().unwrap_or_else(|| tag.anonymous_name())
}

fn push_comment(lines: &mut Lines, tag: &Tag, depth: usize) {
    if let Some(comment) = &tag.comment {
        lines.push(format!("{}// {}", tabs(depth), comment));
    }
}

/* Drop the block separator of a nested block */
fn without_separator(mut lines: Lines) -> Lines {
    if lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    lines
}

impl<'a> Emitter<'a> {
    pub fn new(lookup: &'a NodeLookup<'a>, units: &'a [CompilationUnit], unit: usize) -> Self {
        Self {
            lookup,
            units,
            unit,
            synth: DeclaratorSynth::new(lookup, unit),
        }
    }

    pub fn annotate_params(mut self, annotate: bool) -> Self {
        self.synth = self.synth.annotate_params(annotate);
        self
    }

    fn store(&self) -> &'a TagStore {
        self.lookup.store()
    }

    fn tag(&self, node: &Node) -> &'a Tag {
        node.tag(self.store())
    }

    fn root(&self) -> &'a Node {
        &self.units[self.unit].root
    }

    /// Render every top-level entity of the unit, in tree order.
    pub fn emit_unit(&self) -> Result<Lines, CodegenError> {
        let root = self.root();
        let mut lines = Lines::new();

        for child in &root.children {
            let tag = self.tag(child);
            match tag.kind {
                TagKind::Class | TagKind::Struct | TagKind::Union | TagKind::Enum | TagKind::MemberFunc => {
                    lines.extend(self.dispatch(child, 0)?);
                }
                /* out-of-line member functions render inside their class */
                TagKind::GlobalFunc if tag.member_of_id.is_some() => {}
                TagKind::GlobalFunc => lines.extend(self.function(child, tag, 0)?),
                TagKind::CULocalFunc => {
                    lines.push("// Local to compilation unit".to_string());
                    lines.extend(self.function(child, tag, 0)?);
                }
                TagKind::GlobalVar if self.is_static_member_definition(tag) => {}
                TagKind::GlobalVar => lines.extend(self.variable(child, "")?),
                TagKind::LocalVar => {
                    lines.push("// Local to compilation unit".to_string());
                    lines.extend(self.variable(child, "static ")?);
                }
                kind => trace!("no top-level output for 0x{:X} ({:?})", tag.id, kind),
            }
        }

        Ok(lines)
    }

    /* A global defining a static data member shares its name with the
       member's typedef at unit level */
    fn is_static_member_definition(&self, tag: &Tag) -> bool {
        let Some(name) = tag.name.as_deref() else {
            return false;
        };
        self.root().children.iter().any(|child| {
            let other = self.tag(child);
            other.kind == TagKind::TypeDef && other.name.as_deref() == Some(name)
        })
    }

    fn variable(&self, node: &Node, storage: &str) -> Result<Lines, CodegenError> {
        let tag = self.tag(node);
        let mut lines = Lines::new();
        push_comment(&mut lines, tag, 0);
        if let Some(location) = tag.location {
            lines.push(format!("// Location: 0x{:X}", location));
        }
        let declarator = self.synth.synthesize(node)?;
        lines.push(format!("{}{};", storage, declarator.around(tag.name_str())));
        lines.push(String::new());
        Ok(lines)
    }

    /* Entities that render as their own block, at any depth */
    fn dispatch(&self, node: &Node, depth: usize) -> Result<Lines, CodegenError> {
        match self.tag(node).kind {
            TagKind::Class => self.class_struct(node, true, depth),
            TagKind::Struct => self.class_struct(node, false, depth),
            TagKind::Union => self.union(node, depth),
            TagKind::Enum => Ok(self.enumeration(self.tag(node), depth)),
            TagKind::MemberFunc => self.member_function(node, depth),
            _ => Ok(Lines::new()),
        }
    }

    fn inheritance_list(&self, node: &Node) -> Result<String, CodegenError> {
        let mut bases = Vec::new();
        for child in node.children.iter().take_while(|c| self.tag(c).kind == TagKind::Inheritance) {
            let tag = self.tag(child);
            let name = match &tag.name {
                Some(name) => name.clone(),
                None => self.synth.type_of(tag)?.prefix.trim_end().to_string(),
            };
            match tag.access_level.keyword() {
                Some(access) => bases.push(format!("{} {}", access, name)),
                None => bases.push(name),
            }
        }

        if bases.is_empty() {
            Ok(String::new())
        } else {
            Ok(format!(" : {}", bases.join(", ")))
        }
    }

    fn member_line(&self, node: &Node, depth: usize) -> Result<String, CodegenError> {
        let tag = self.tag(node);
        let declarator = self.synth.synthesize(node)?;

        let mut line = format!(
            "{}\t{}{}",
            tabs(depth),
            if tag.is_static { "static " } else { "" },
            declarator.around(tag.name_str())
        );
        if let Some(bits) = tag.bit_size.filter(|&bits| bits > 0) {
            line.push_str(&format!(": {}", bits));
        }
        line.push(';');
        if let Some(comment) = tag.comment.as_ref().filter(|_| !tag.is_static) {
            line.push_str(&format!(" // {}", comment));
        }
        Ok(line)
    }

    fn class_struct(&self, node: &Node, is_class: bool, depth: usize) -> Result<Lines, CodegenError> {
        let current = self.tag(node);
        let indent = tabs(depth);
        let mut lines = Lines::new();

        push_comment(&mut lines, current, depth);
        lines.push(format!(
            "{}{} {}{}",
            indent,
            if is_class { "class" } else { "struct" },
            display_name(current),
            self.inheritance_list(node)?
        ));
        lines.push(format!("{}{{", indent));

        let children: Vec<&Tag> = node.children.iter().map(|child| self.tag(child)).collect();
        let spans = anonymous_union_spans(&children);

        let mut access = if is_class {
            AccessLevel::Private
        } else {
            AccessLevel::Public
        };
        let mut member_funcs: Vec<&Node> = Vec::new();

        for (position, child) in node.children.iter().enumerate() {
            let tag = children[position];
            match tag.kind {
                TagKind::Inheritance => continue,
                TagKind::MemberFunc => {
                    member_funcs.push(child);
                    continue;
                }
                TagKind::Class | TagKind::Struct | TagKind::Union | TagKind::Enum => {
                    lines.push(String::new());
                    lines.extend(without_separator(self.dispatch(child, depth + 1)?));
                    continue;
                }
                TagKind::Member | TagKind::TypeDef | TagKind::GlobalVar => {}
                kind => {
                    trace!("skipping 0x{:X} ({:?}) inside 0x{:X}", tag.id, kind, current.id);
                    continue;
                }
            }

            /* everything inside a span is emitted at its start */
            let span = spans.iter().find(|span| span.contains(&position));
            if span.is_some_and(|span| span.start != position) {
                continue;
            }

            if tag.access_level != access && tag.access_level != AccessLevel::None {
                if let Some(keyword) = tag.access_level.keyword() {
                    lines.push(format!("{}{}:", indent, keyword));
                }
                access = tag.access_level;
            }

            match span {
                Some(span) => {
                    let (members, statics): (Vec<&Node>, Vec<&Node>) = node.children[span.clone()]
                        .iter()
                        .filter(|child| {
                            matches!(
                                self.tag(child).kind,
                                TagKind::Member | TagKind::TypeDef | TagKind::GlobalVar
                            )
                        })
                        .partition(|child| self.tag(child).kind == TagKind::Member);
                    /* statics inside the span precede the union */
                    for member in statics {
                        lines.push(self.member_line(member, depth)?);
                    }
                    lines.extend(self.anonymous_union(&members, depth + 1)?);
                }
                None => lines.push(self.member_line(child, depth)?),
            }
        }

        /* true per-method access is not recorded, so all methods are public */
        let out_of_line = self.root().children.iter().filter(|child| {
            let tag = self.tag(child);
            tag.kind == TagKind::GlobalFunc && tag.member_of_id == Some(current.id)
        });
        let mut functions = Lines::new();
        for func in member_funcs {
            functions.extend(self.member_function(func, depth + 1)?);
        }
        for func in out_of_line {
            functions.extend(self.function(func, self.tag(func), depth + 1)?);
        }
        if !functions.is_empty() {
            lines.push(String::new());
            lines.push(format!("{}public:", indent));
            lines.extend(without_separator(functions));
        }

        lines.push(format!("{}}};", indent));
        lines.push(String::new());
        Ok(lines)
    }

    /* Members sharing storage; runs of bitfields are packed into anonymous structs */
    fn anonymous_union(&self, members: &[&Node], depth: usize) -> Result<Lines, CodegenError> {
        let indent = tabs(depth);
        let mut lines = vec![String::new(), format!("{}union", indent), format!("{}{{", indent)];

        let mut in_struct = false;
        for member in members {
            let tag = self.tag(member);
            if tag.is_bitfield() && !in_struct {
                lines.push(format!("{}\tstruct", indent));
                lines.push(format!("{}\t{{", indent));
                in_struct = true;
            } else if !tag.is_bitfield() && in_struct {
                lines.push(format!("{}\t}};", indent));
                in_struct = false;
            }

            let inner = if in_struct { "\t\t" } else { "\t" };
            let declarator = self.synth.synthesize(member)?;
            let mut line = format!("{}{}{}", indent, inner, declarator.around(tag.name_str()));
            match tag.bit_size.filter(|_| tag.is_bitfield()) {
                Some(bits) => line.push_str(&format!(": {};", bits)),
                None => {
                    line.push(';');
                    if let Some(comment) = &tag.comment {
                        line.push_str(&format!(" // {}", comment));
                    }
                }
            }
            lines.push(line);
        }
        if in_struct {
            lines.push(format!("{}\t}};", indent));
        }

        lines.push(format!("{}}};", indent));
        lines.push(String::new());
        Ok(lines)
    }

    fn union(&self, node: &Node, depth: usize) -> Result<Lines, CodegenError> {
        let current = self.tag(node);
        let indent = tabs(depth);
        let mut lines = Lines::new();

        push_comment(&mut lines, current, depth);
        lines.push(format!("{}union {}", indent, display_name(current)));
        lines.push(format!("{}{{", indent));

        for child in &node.children {
            let tag = self.tag(child);
            if tag.kind != TagKind::Member {
                return Err(CodegenError::UnsupportedConstruct {
                    tag_id: tag.id,
                    kind: tag.kind,
                    context: "inside a union",
                });
            }
            lines.push(self.member_line(child, depth)?);
        }

        lines.push(format!("{}}};", indent));
        lines.push(String::new());
        Ok(lines)
    }

    fn enumeration(&self, current: &Tag, depth: usize) -> Lines {
        let indent = tabs(depth);
        let mut lines = Lines::new();

        push_comment(&mut lines, current, depth);
        match &current.name {
            Some(name) => lines.push(format!("{}enum {}", indent, name)),
            None => lines.push(format!("{}enum", indent)),
        }
        lines.push(format!("{}{{", indent));

        let first_element = lines.len();
        for element in &current.elements {
            lines.push(format!("{}\t{}", indent, element));
        }
        if lines.len() > first_element {
            if let Some(last) = lines.last_mut() {
                if last.ends_with(',') {
                    last.pop();
                }
            }
        }

        lines.push(format!("{}}};", indent));
        lines.push(String::new());
        lines
    }

    /* A member function whose type names a function-like tag takes that
       tag's signature */
    fn member_function(&self, node: &Node, depth: usize) -> Result<Lines, CodegenError> {
        let tag = self.tag(node);
        let Some(type_id) = tag.type_ref.user_id() else {
            return self.function(node, tag, depth);
        };
        let target = self
            .lookup
            .find(self.unit, type_id)
            .ok_or(CodegenError::UnresolvedReference {
                tag_id: tag.id,
                type_id,
            })?;
        let definition = self.tag(target);
        if definition.kind.is_function() || definition.kind == TagKind::FunctionPointer {
            /* staticness may only be recorded on the definition */
            let mut decl = tag.clone();
            decl.is_static |= definition.is_static;
            self.function(target, &decl, depth)
        } else {
            self.function(node, tag, depth)
        }
    }

    /// Render a function. `signature` supplies the return type, parameters,
    /// locals and references; `decl` the name, storage and comment.
    fn function(&self, signature: &Node, decl: &Tag, depth: usize) -> Result<Lines, CodegenError> {
        let indent = tabs(depth);
        let sig_tag = self.tag(signature);
        let returns = self.synth.synthesize(signature)?;
        let mut lines = Lines::new();

        push_comment(&mut lines, decl, depth);

        let mut params = Vec::new();
        let mut locals = Vec::new();
        let mut unnamed = 0;
        for child in &signature.children {
            let tag = self.tag(child);
            if tag.name.as_deref() == Some("this") {
                continue;
            }
            match tag.kind {
                TagKind::Param => {
                    let name = match &tag.name {
                        Some(name) => name.clone(),
                        None => {
                            unnamed += 1;
                            format!("unknown{}", unnamed - 1)
                        }
                    };
                    params.push(self.synth.synthesize(child)?.around(&name));
                }
                TagKind::VariadicParam => params.push("...".to_string()),
                TagKind::LocalVar => {
                    let declarator = self.synth.synthesize(child)?;
                    locals.push(format!("{}\t{};", indent, declarator.around(tag.name_str())));
                }
                _ => {}
            }
        }

        let mut line = format!(
            "{}{}{}({}){}",
            indent,
            if decl.is_static { "static " } else { "" },
            returns.prefix + decl.name_str(),
            params.join(", "),
            returns.suffix
        );

        if locals.is_empty() && sig_tag.references.is_empty() {
            line.push(';');
            lines.push(line);
        } else {
            lines.push(line);
            lines.push(format!("{}{{", indent));
            lines.extend(locals);
            for &reference in &sig_tag.references {
                lines.push(self.reference_line(reference, depth));
            }
            lines.push(format!("{}}}", indent));
        }

        lines.push(String::new());
        Ok(lines)
    }

    fn reference_line(&self, id: u32, depth: usize) -> String {
        let referenced = self.store().by_id(id);
        let name = referenced
            .and_then(|tag| tag.name.clone())
            .unwrap_or_else(|| format!("unknown_0x{:X}", id));
        let mut line = format!("{}\t// References: {}", tabs(depth), name);
        if let Some(location) = referenced.and_then(|tag| tag.location) {
            line.push_str(&format!(" (0x{:X})", location));
        }
        line
    }
}
