/* Tree construction from sibling chains
 *
 * A tag owns the tags stored between itself and its sibling. The first of
 * those starts a chain of siblings that ends at a NULL entry (or at a tag
 * without a sibling); every chain element is a child, and the rule recurses.
 */

use super::{CompilationUnit, Node};
use crate::error::GraphError;
use dwarf1_types::{TagKind, TagStore};
use tracing::trace;

/* Position a tag's sibling link points at, checked to move forward */
fn next_in_chain(store: &TagStore, position: usize) -> Result<Option<usize>, GraphError> {
    let tag = &store[position];
    let Some(sibling_id) = tag.sibling_id else {
        return Ok(None);
    };
    let sibling = store.index_of(sibling_id).ok_or(GraphError::DanglingSibling {
        tag_id: tag.id,
        sibling_id,
    })?;
    if sibling <= position {
        return Err(GraphError::BackwardSibling {
            tag_id: tag.id,
            sibling_id,
        });
    }
    Ok(Some(sibling))
}

/* End (exclusive) of the positions a tag may own as descendants */
fn child_bound(store: &TagStore, position: usize) -> Result<Option<usize>, GraphError> {
    match next_in_chain(store, position)? {
        Some(sibling) => Ok(Some(sibling)),
        /* the last unit runs to the end of the store */
        None if store[position].kind == TagKind::CompileUnit => Ok(Some(store.len())),
        None => Ok(None),
    }
}

/* Whether the chain starting right after a parent escapes the parent's range.
   Such a chain belongs to a stray run, not to the parent. */
fn chain_escapes(store: &TagStore, child_start: usize, bound: usize) -> Result<bool, GraphError> {
    let mut current = child_start;
    while let Some(next) = next_in_chain(store, current)? {
        if next >= bound {
            return Ok(true);
        }
        current = next;
    }
    Ok(false)
}

fn add_children(store: &TagStore, node: &mut Node) -> Result<(), GraphError> {
    let parent = &store[node.index];
    if !parent.kind.can_have_children() {
        return Ok(());
    }
    let Some(bound) = child_bound(store, node.index)? else {
        return Ok(());
    };

    let child_start = node.index + 1;
    if child_start >= bound {
        return Ok(());
    }

    /* the root's layout is trusted */
    if parent.kind != TagKind::CompileUnit && chain_escapes(store, child_start, bound)? {
        trace!(
            "tag 0x{:X}: physical successor 0x{:X} is stray",
            parent.id,
            store[child_start].id
        );
        return Ok(());
    }

    let mut current = Some(child_start);
    while let Some(position) = current {
        if position >= bound || store[position].is_end() {
            break;
        }
        node.children.push(Node::new(position));
        current = next_in_chain(store, position)?;
    }

    for child in &mut node.children {
        add_children(store, child)?;
    }

    Ok(())
}

/* Build the tree of the compile unit stored at `position` */
pub fn build_unit(store: &TagStore, position: usize) -> Result<CompilationUnit, GraphError> {
    let tag = &store[position];
    let end = child_bound(store, position)?.unwrap_or(position + 1);

    let mut root = Node::new(position);
    add_children(store, &mut root)?;

    Ok(CompilationUnit {
        root,
        name: tag.name.clone().unwrap_or_default(),
        language: tag.language.unwrap_or_default(),
        range: position..end,
    })
}
