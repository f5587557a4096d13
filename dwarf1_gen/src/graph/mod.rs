//! Unit trees over the tag store
//!
//! Tags only know their sibling and (implicitly) their first child. This
//! module turns that flat linkage into one tree per compilation unit. Nodes
//! hold positions into the [`TagStore`] arena; tag data is never copied.

pub mod builder;
pub mod repair;

use dwarf1_types::{Language, Tag, TagKind, TagStore};
use std::collections::HashMap;
use std::ops::Range;

pub use builder::build_unit;
pub use repair::{
    link_first_children, repair_stray_chains, terminate_final_unit, Relink, RepairFailure, RepairReport,
};

/* A tag position plus its children, in declaration order */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub index: usize,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            children: Vec::new(),
        }
    }

    pub fn tag<'s>(&self, store: &'s TagStore) -> &'s Tag {
        &store[self.index]
    }

    /* Depth-first search for the node at a store position */
    pub fn find(&self, index: usize) -> Option<&Node> {
        if self.index == index {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(index))
    }

    /* Pre-order visit of this node and all descendants */
    pub fn walk<'n>(&'n self, visit: &mut impl FnMut(&'n Node)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Node::count).sum::<usize>()
    }
}

/* One source file's tree */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationUnit {
    pub root: Node,
    pub name: String,
    pub language: Language,
    /* Store positions owned by this unit */
    pub range: Range<usize>,
}

impl CompilationUnit {
    pub fn id(&self, store: &TagStore) -> u32 {
        store[self.root.index].id
    }
}

/* Store positions of every compile unit tag, in store order */
pub fn unit_positions(store: &TagStore) -> Vec<usize> {
    store
        .iter()
        .enumerate()
        .filter(|(_, tag)| tag.kind == TagKind::CompileUnit)
        .map(|(position, _)| position)
        .collect()
}

/* Finds nodes by tag ID across all unit trees, preferring the unit being
   emitted and then the others in store order. */
pub struct NodeLookup<'a> {
    store: &'a TagStore,
    per_unit: Vec<HashMap<usize, &'a Node>>,
}

impl<'a> NodeLookup<'a> {
    pub fn new(store: &'a TagStore, units: &'a [CompilationUnit]) -> Self {
        let per_unit = units
            .iter()
            .map(|unit| {
                let mut nodes = HashMap::new();
                unit.root.walk(&mut |node| {
                    nodes.insert(node.index, node);
                });
                nodes
            })
            .collect();
        Self { store, per_unit }
    }

    pub fn store(&self) -> &'a TagStore {
        self.store
    }

    pub fn find(&self, unit: usize, id: u32) -> Option<&'a Node> {
        let index = self.store.index_of(id)?;
        if let Some(node) = self.per_unit.get(unit).and_then(|nodes| nodes.get(&index).copied()) {
            return Some(node);
        }
        self.per_unit
            .iter()
            .enumerate()
            .filter(|(other, _)| *other != unit)
            .find_map(|(_, nodes)| nodes.get(&index).copied())
    }
}
