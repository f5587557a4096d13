//! Semantic fixups
//!
//! Runs once after the unit trees exist. Every rule is a small function
//! over plain values so it can be tested on its own; [`run`] applies them to
//! the store in a fixed order.

use crate::error::FixupError;
use crate::graph::{CompilationUnit, Node};
use dwarf1_types::{BuiltinType, Tag, TagKind, TagStore, TypeRef};
use std::collections::HashSet;
use tracing::{debug, info};

/* Where a tag sits structurally */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Unit,
    Aggregate,
    Function,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixupReport {
    pub padding_reclassified: usize,
    pub functions_demoted: usize,
    pub static_cleared: usize,
    pub returns_defaulted: usize,
    pub dirty_resolved: usize,
    pub sizes_recovered: usize,
    pub names_rewritten: usize,
    pub names_disambiguated: usize,
    pub modifiers_reversed: bool,
}

/* ===== Rules ===== */

/* The kind a padding tag stands for. Functions start out global; nested ones
   are demoted by `demote_nested_function`. */
pub fn resolve_padding(is_function: bool, scope: Scope) -> TagKind {
    match (is_function, scope) {
        (true, _) => TagKind::GlobalFunc,
        (false, Scope::Unit) => TagKind::GlobalVar,
        (false, Scope::Aggregate) => TagKind::Member,
        (false, Scope::Function) => TagKind::LocalVar,
    }
}

pub fn demote_nested_function(kind: TagKind, scope: Scope) -> TagKind {
    match (kind, scope) {
        (TagKind::GlobalFunc, Scope::Aggregate) => TagKind::MemberFunc,
        (kind, _) => kind,
    }
}

/* Static member functions are the ones without an implicit `this`.
   This mirrors how the Metrowerks encoder marks methods and is not a
   general rule. */
pub fn keeps_static(was_static: bool, first_param_name: Option<&str>) -> bool {
    was_static && first_param_name != Some("this")
}

pub fn default_return_type(kind: TagKind, type_ref: TypeRef) -> TypeRef {
    if kind.is_function() && type_ref.is_unset() {
        TypeRef::Builtin(BuiltinType::Void)
    } else {
        type_ref
    }
}

/* Size of an untyped tag, taken from the distance to its sibling.
   Locations are addresses stored as i32, so the distance wraps. */
pub fn recovered_size(tag: &Tag, sibling: Option<&Tag>) -> Option<i32> {
    if tag.type_ref != TypeRef::Builtin(BuiltinType::Unknown) {
        return None;
    }
    let sibling = sibling.filter(|s| !s.is_end())?;
    Some(sibling.location?.wrapping_sub(tag.location?))
}

/* Names the encoder emits with a leading `@` are not identifiers */
pub fn sanitized_name(tag: &Tag) -> Option<String> {
    tag.name
        .as_deref()
        .filter(|name| name.starts_with('@'))
        .map(|_| tag.anonymous_name())
}

/* New names for the repeats among a unit's top-level symbols, in order */
pub fn disambiguated_names<'t>(tags: impl IntoIterator<Item = &'t Tag>) -> Vec<(u32, String)> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut renames = Vec::new();
    for tag in tags {
        if !tag.kind.is_top_level_symbol() {
            continue;
        }
        let Some(name) = tag.name.as_deref() else {
            continue;
        };
        if !seen.insert(name) {
            renames.push((tag.id, format!("{}_0x{:X}", name, tag.id)));
        }
    }
    renames
}

/* ===== Passes ===== */

fn classify_structure(store: &mut TagStore, node: &Node, scope: Scope, report: &mut FixupReport) {
    for child in &node.children {
        let tag = &mut store[child.index];

        if tag.kind == TagKind::Padding {
            tag.kind = resolve_padding(tag.is_function, scope);
            report.padding_reclassified += 1;
        }

        let demoted = demote_nested_function(tag.kind, scope);
        if demoted != tag.kind {
            tag.kind = demoted;
            report.functions_demoted += 1;
        }

        let child_scope = if tag.kind.is_aggregate() {
            Scope::Aggregate
        } else if tag.kind.is_function() {
            Scope::Function
        } else {
            scope
        };
        classify_structure(store, child, child_scope, report);
    }
}

fn resolve_dirty(
    store: &mut TagStore,
    position: usize,
    in_progress: &mut Vec<usize>,
) -> Result<bool, FixupError> {
    let tag = &store[position];
    if !tag.is_dirty {
        return Ok(false);
    }
    if in_progress.contains(&position) {
        return Err(FixupError::DirtyCycle(tag.id));
    }

    let target_size = match tag.type_ref.user_id() {
        /* pointer-sized no matter what it points at */
        _ if tag.is_pointer => 4,
        Some(type_id) => {
            let target = store.index_of(type_id).ok_or(FixupError::UnresolvedType {
                tag_id: tag.id,
                type_id,
            })?;
            in_progress.push(position);
            resolve_dirty(store, target, in_progress)?;
            in_progress.pop();
            store[target].size
        }
        None => store[position].size,
    };

    let tag = &mut store[position];
    tag.size = tag.size_from_target(target_size);
    tag.is_dirty = false;
    Ok(true)
}

/* Apply every fixup rule to the store */
pub fn run(store: &mut TagStore, units: &[CompilationUnit]) -> Result<FixupReport, FixupError> {
    let mut report = FixupReport::default();

    for unit in units {
        classify_structure(store, &unit.root, Scope::Unit, &mut report);
    }
    /* padding no tree reached is treated as unit scope */
    for tag in store.iter_mut().filter(|tag| tag.kind == TagKind::Padding) {
        tag.kind = resolve_padding(tag.is_function, Scope::Unit);
        report.padding_reclassified += 1;
    }

    let mut in_progress = Vec::new();
    for position in 0..store.len() {
        if resolve_dirty(store, position, &mut in_progress)? {
            report.dirty_resolved += 1;
        }
    }

    for position in 0..store.len() {
        let tag = &store[position];

        let first_param = tag
            .first_child_id
            .and_then(|id| store.by_id(id))
            .and_then(|child| child.name.clone());
        let sibling = tag.sibling_id.and_then(|id| store.by_id(id));
        let recovered = recovered_size(tag, sibling);
        let renamed = sanitized_name(tag);

        let tag = &mut store[position];

        if matches!(tag.kind, TagKind::GlobalFunc | TagKind::MemberFunc) && tag.is_static {
            tag.is_static = keeps_static(true, first_param.as_deref());
            if !tag.is_static {
                report.static_cleared += 1;
            }
        }

        let return_type = default_return_type(tag.kind, tag.type_ref);
        if return_type != tag.type_ref {
            tag.type_ref = return_type;
            report.returns_defaulted += 1;
        }

        if let Some(size) = recovered {
            tag.size = size;
            report.sizes_recovered += 1;
        }

        if let Some(name) = renamed {
            tag.name = Some(name);
            report.names_rewritten += 1;
        }
    }

    for unit in units {
        let renames = disambiguated_names(unit.root.children.iter().map(|child| &store[child.index]));
        for (id, name) in renames {
            debug!("renamed duplicate symbol 0x{:X} to {}", id, name);
            if let Some(tag) = store.by_id_mut(id) {
                tag.name = Some(name);
                report.names_disambiguated += 1;
            }
        }
    }

    report.modifiers_reversed = store.reverse_modifiers();

    info!(
        "fixup: {} padding, {} demoted, {} dirty sizes, {} renamed",
        report.padding_reclassified,
        report.functions_demoted,
        report.dirty_resolved,
        report.names_rewritten + report.names_disambiguated
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dwarf1_types::{Language, Modifier};

    fn store(tags: Vec<Tag>) -> TagStore {
        let mut store = TagStore::new();
        for tag in tags {
            store.push(tag).unwrap();
        }
        store
    }

    fn unit(root: Node) -> CompilationUnit {
        CompilationUnit {
            root,
            name: "a.cpp".into(),
            language: Language::Cpp,
            range: 0..0,
        }
    }

    #[test]
    fn test_resolve_padding_by_scope() {
        assert_eq!(resolve_padding(true, Scope::Unit), TagKind::GlobalFunc);
        assert_eq!(resolve_padding(false, Scope::Unit), TagKind::GlobalVar);
        assert_eq!(resolve_padding(false, Scope::Aggregate), TagKind::Member);
        assert_eq!(
            demote_nested_function(resolve_padding(true, Scope::Aggregate), Scope::Aggregate),
            TagKind::MemberFunc
        );
    }

    #[test]
    fn test_keeps_static() {
        assert!(!keeps_static(true, Some("this")));
        assert!(keeps_static(true, Some("other")));
        assert!(keeps_static(true, None));
        assert!(!keeps_static(false, Some("other")));
    }

    #[test]
    fn test_default_return_type() {
        assert_eq!(
            default_return_type(TagKind::CULocalFunc, TypeRef::Unset),
            TypeRef::Builtin(BuiltinType::Void)
        );
        assert_eq!(default_return_type(TagKind::Member, TypeRef::Unset), TypeRef::Unset);
        assert_eq!(
            default_return_type(TagKind::GlobalFunc, TypeRef::User(0x40)),
            TypeRef::User(0x40)
        );
    }

    #[test]
    fn test_recovered_size() {
        let tag = Tag::new(0x10, TagKind::Member)
            .with_type(TypeRef::Builtin(BuiltinType::Unknown))
            .with_location(0x8);
        let sibling = Tag::new(0x20, TagKind::Member).with_location(0x14);
        let end = Tag::new(0x20, TagKind::End);

        assert_eq!(recovered_size(&tag, Some(&sibling)), Some(0xc));
        assert_eq!(recovered_size(&tag, Some(&end)), None);
        assert_eq!(recovered_size(&tag, None), None);
    }

    #[test]
    fn test_recovered_size_wraps_high_addresses() {
        let tag = Tag::new(0x10, TagKind::GlobalVar)
            .with_type(TypeRef::Builtin(BuiltinType::Unknown))
            .with_location(0x8000_0000_u32 as i32);
        let sibling = Tag::new(0x20, TagKind::GlobalVar).with_location(0x10);

        assert_eq!(
            recovered_size(&tag, Some(&sibling)),
            Some(0x10_i32.wrapping_sub(0x8000_0000_u32 as i32))
        );

        let tag = tag.with_location(0x8040_0000_u32 as i32);
        let sibling = sibling.with_location(0x8040_0020_u32 as i32);
        assert_eq!(recovered_size(&tag, Some(&sibling)), Some(0x20));
    }

    #[test]
    fn test_sanitized_name() {
        let tag = Tag::new(0x1f0, TagKind::Struct).with_name("@class$12");
        assert_eq!(sanitized_name(&tag).as_deref(), Some("__anon_0x1F0"));
        assert_eq!(sanitized_name(&Tag::new(0x10, TagKind::Struct).with_name("Ok")), None);
    }

    #[test]
    fn test_disambiguated_names() {
        let tags = vec![
            Tag::new(0x10, TagKind::GlobalVar).with_name("counter"),
            Tag::new(0x20, TagKind::GlobalVar).with_name("counter"),
            Tag::new(0x30, TagKind::TypeDef).with_name("counter"),
            Tag::new(0x40, TagKind::GlobalVar),
        ];
        assert_eq!(
            disambiguated_names(&tags),
            vec![(0x20, "counter_0x20".to_string())]
        );
    }

    #[test]
    fn test_run_reclassifies_by_depth() {
        let mut store = store(vec![
            Tag::new(0x10, TagKind::CompileUnit),
            Tag::new(0x20, TagKind::Padding).with_name("gCount").with_sibling(0x30),
            Tag::new(0x30, TagKind::Class).with_name("Foo").with_sibling(0x70),
            Tag::new(0x40, TagKind::Padding).with_name("mValue").with_sibling(0x50),
            Tag::new(0x50, TagKind::GlobalFunc).with_name("Get").with_sibling(0x60),
            Tag::new(0x60, TagKind::End),
            Tag::new(0x70, TagKind::End),
        ]);
        let units = vec![unit(Node {
            index: 0,
            children: vec![
                Node::new(1),
                Node {
                    index: 2,
                    children: vec![Node::new(3), Node::new(4)],
                },
            ],
        })];

        let report = run(&mut store, &units).unwrap();

        assert_eq!(store[1].kind, TagKind::GlobalVar);
        assert_eq!(store[3].kind, TagKind::Member);
        assert_eq!(store[4].kind, TagKind::MemberFunc);
        assert_eq!(store[4].type_ref, TypeRef::Builtin(BuiltinType::Void));
        assert_eq!(report.padding_reclassified, 2);
        assert_eq!(report.functions_demoted, 1);
        assert!(store.iter().all(|tag| tag.kind != TagKind::Padding));
    }

    #[test]
    fn test_run_static_member_function() {
        let mut method = Tag::new(0x20, TagKind::GlobalFunc).with_name("Update");
        method.is_static = true;
        method.first_child_id = Some(0x30);
        let mut helper = Tag::new(0x50, TagKind::GlobalFunc).with_name("Create");
        helper.is_static = true;
        helper.first_child_id = Some(0x60);

        let mut store = store(vec![
            Tag::new(0x10, TagKind::CompileUnit),
            method,
            Tag::new(0x30, TagKind::Param).with_name("this"),
            Tag::new(0x40, TagKind::End),
            helper,
            Tag::new(0x60, TagKind::Param).with_name("count"),
            Tag::new(0x70, TagKind::End),
        ]);

        let report = run(&mut store, &[]).unwrap();
        assert!(!store[1].is_static);
        assert!(store[4].is_static);
        assert_eq!(report.static_cleared, 1);
    }

    #[test]
    fn test_run_resolves_dirty_sizes() {
        let mut pointer = Tag::new(0x20, TagKind::Member).with_type(TypeRef::User(0x40));
        pointer.modifiers = vec![Modifier::Pointer];
        pointer.derive_indirection();
        pointer.is_dirty = true;
        pointer.size = -1;

        let mut by_value = Tag::new(0x30, TagKind::Member).with_type(TypeRef::User(0x40));
        by_value.is_dirty = true;
        by_value.size = -1;

        let mut target = Tag::new(0x40, TagKind::Struct);
        target.size = 0x24;

        /* a reference to an array of four targets */
        let mut array = Tag::new(0x50, TagKind::ArrayType).with_type(TypeRef::User(0x40));
        array.length = 3;
        array.is_dirty = true;
        array.size = -1;

        let mut reference = Tag::new(0x60, TagKind::Param).with_type(TypeRef::User(0x50));
        reference.modifiers = vec![Modifier::Reference];
        reference.derive_indirection();
        reference.is_dirty = true;
        reference.size = -1;

        let mut store = store(vec![
            Tag::new(0x10, TagKind::CompileUnit),
            pointer,
            by_value,
            target,
            reference,
            array,
        ]);
        let report = run(&mut store, &[]).unwrap();

        assert_eq!(store[1].size, 4);
        assert_eq!(store[2].size, 0x24);
        assert_eq!(store.by_id(0x50).unwrap().size, 0x90);
        assert_eq!(store.by_id(0x60).unwrap().size, 0x90);
        assert!(store.iter().all(|tag| !tag.is_dirty));
        assert_eq!(report.dirty_resolved, 4);
    }

    #[test]
    fn test_run_dirty_cycle_is_error() {
        let mut a = Tag::new(0x20, TagKind::TypeDef).with_type(TypeRef::User(0x30));
        a.is_dirty = true;
        let mut b = Tag::new(0x30, TagKind::TypeDef).with_type(TypeRef::User(0x20));
        b.is_dirty = true;

        let mut store = store(vec![a, b]);
        let err = run(&mut store, &[]).unwrap_err();
        assert!(matches!(err, FixupError::DirtyCycle(_)));
    }

    #[test]
    fn test_run_reverses_modifiers_once() {
        let mut tag = Tag::new(0x20, TagKind::Member);
        tag.modifiers = vec![Modifier::Pointer, Modifier::Const];
        let mut store = store(vec![tag]);

        let report = run(&mut store, &[]).unwrap();
        assert!(report.modifiers_reversed);
        assert_eq!(store[0].modifiers, vec![Modifier::Const, Modifier::Pointer]);

        let again = run(&mut store, &[]).unwrap();
        assert!(!again.modifiers_reversed);
        assert_eq!(store[0].modifiers, vec![Modifier::Const, Modifier::Pointer]);
    }
}
