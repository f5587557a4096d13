use crate::tag::Tag;
use std::collections::HashMap;
use std::ops::{Index, IndexMut};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    /// Two tags in the dump carry the same ID
    #[error("duplicate tag ID 0x{0:X}")]
    DuplicateId(u32),
}

/* Append-only arena of tags in dump order, plus the ID -> position map.
   Tags are never removed, so positions stay stable for the whole run. */
#[derive(Debug, Default, Clone)]
pub struct TagStore {
    tags: Vec<Tag>,
    index: HashMap<u32, usize>,
    modifiers_reversed: bool,
}

impl TagStore {
    pub fn new() -> Self {
        Self::default()
    }

    /* Append a tag, returning its position */
    pub fn push(&mut self, tag: Tag) -> Result<usize, StoreError> {
        if self.index.contains_key(&tag.id) {
            return Err(StoreError::DuplicateId(tag.id));
        }
        let position = self.tags.len();
        self.index.insert(tag.id, position);
        self.tags.push(tag);
        Ok(position)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn contains(&self, id: u32) -> bool {
        self.index.contains_key(&id)
    }

    pub fn index_of(&self, id: u32) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn get(&self, position: usize) -> Option<&Tag> {
        self.tags.get(position)
    }

    pub fn get_mut(&mut self, position: usize) -> Option<&mut Tag> {
        self.tags.get_mut(position)
    }

    pub fn by_id(&self, id: u32) -> Option<&Tag> {
        self.index_of(id).map(|position| &self.tags[position])
    }

    pub fn by_id_mut(&mut self, id: u32) -> Option<&mut Tag> {
        let position = self.index_of(id)?;
        self.tags.get_mut(position)
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
        self.tags.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Tag> {
        self.tags.iter_mut()
    }

    /* Position of the tag a sibling link points at */
    pub fn sibling_index(&self, position: usize) -> Option<usize> {
        self.tags
            .get(position)
            .and_then(|tag| tag.sibling_id)
            .and_then(|id| self.index_of(id))
    }

    /* Flip every modifier list from parse order to declarator order. Only the
       first call has an effect; returns whether this call did the reversal. */
    pub fn reverse_modifiers(&mut self) -> bool {
        if self.modifiers_reversed {
            return false;
        }
        for tag in &mut self.tags {
            tag.modifiers.reverse();
        }
        self.modifiers_reversed = true;
        true
    }

    pub fn modifiers_reversed(&self) -> bool {
        self.modifiers_reversed
    }
}

impl Index<usize> for TagStore {
    type Output = Tag;

    fn index(&self, position: usize) -> &Tag {
        &self.tags[position]
    }
}

impl IndexMut<usize> for TagStore {
    fn index_mut(&mut self, position: usize) -> &mut Tag {
        &mut self.tags[position]
    }
}

impl<'a> IntoIterator for &'a TagStore {
    type Item = &'a Tag;
    type IntoIter = std::slice::Iter<'a, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.tags.iter()
    }
}
