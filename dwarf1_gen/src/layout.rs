/* Aggregate layout analysis
 *
 * The format has no notion of an anonymous union. Members that share a byte
 * offset are the only trace of one, so a union is inferred from location
 * groups: every group of two or more members spans from its first to its
 * last member, overlapping spans merge, and a group made entirely of
 * bitfields at that offset is just a packed bitfield run.
 */

use crate::graph::{CompilationUnit, Node};
use dwarf1_types::{Tag, TagKind, TagStore};
use indexmap::IndexMap;
use std::ops::Range;
use tracing::debug;

fn is_located_member(tag: &Tag) -> bool {
    tag.kind == TagKind::Member && tag.location.is_some_and(|location| location >= 0)
}

/// Child ranges of an aggregate that render as anonymous unions.
///
/// `children` are the aggregate's children in declaration order; ranges are
/// positions into that slice, sorted and disjoint.
pub fn anonymous_union_spans(children: &[&Tag]) -> Vec<Range<usize>> {
    /* positions per location, first-seen order */
    let mut groups: IndexMap<i32, Vec<usize>> = IndexMap::new();
    for (position, tag) in children.iter().enumerate() {
        if let Some(location) = tag.location.filter(|_| is_located_member(tag)) {
            groups.entry(location).or_default().push(position);
        }
    }

    let mut spans: Vec<Range<usize>> = groups
        .values()
        .filter(|positions| positions.len() >= 2)
        .filter(|positions| !positions.iter().all(|&p| children[p].is_bitfield()))
        .filter_map(|positions| Some(*positions.first()?..*positions.last()? + 1))
        .collect();
    spans.sort_by_key(|span| span.start);

    let mut merged: Vec<Range<usize>> = Vec::with_capacity(spans.len());
    for span in spans {
        match merged.last_mut() {
            Some(last) if span.start < last.end => last.end = last.end.max(span.end),
            _ => merged.push(span),
        }
    }
    merged
}

fn mark_node(store: &mut TagStore, node: &Node) -> usize {
    let mut marked = 0;

    if store[node.index].kind.is_aggregate() && store[node.index].kind != TagKind::Union {
        let spans = {
            let children: Vec<&Tag> = node.children.iter().map(|child| &store[child.index]).collect();
            anonymous_union_spans(&children)
        };
        for span in spans {
            for child in &node.children[span] {
                let tag = &mut store[child.index];
                if tag.kind == TagKind::Member {
                    tag.is_anon_union_member = true;
                    marked += 1;
                }
            }
        }
    }

    for child in &node.children {
        marked += mark_node(store, child);
    }
    marked
}

/* Flag every class and struct member that sits inside an anonymous union.
   Returns the number of members flagged. */
pub fn mark_anonymous_unions(store: &mut TagStore, units: &[CompilationUnit]) -> usize {
    let marked = units.iter().map(|unit| mark_node(store, &unit.root)).sum();
    debug!("{} members placed in anonymous unions", marked);
    marked
}
