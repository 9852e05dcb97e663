use crate::doc::DocumentError;
use crate::doc::id::{OpId, Stamp};

#[derive(Debug, Clone)]
struct Item {
    id: OpId,
    stamp: Stamp,
    ch: char,
    deleted: bool,
}

/// Replicated growable array of characters.
///
/// Items are never removed, only tombstoned, so every `OpId` that was ever
/// integrated stays addressable as an insert origin or delete target.
#[derive(Debug, Clone, Default)]
pub(crate) struct TextSequence {
    items: Vec<Item>,
    visible: usize,
}

impl TextSequence {
    pub fn len(&self) -> usize {
        self.visible
    }

    pub fn text(&self) -> String {
        self.items
            .iter()
            .filter(|item| !item.deleted)
            .map(|item| item.ch)
            .collect()
    }

    pub fn contains(&self, id: OpId) -> bool {
        self.position(id).is_some()
    }

    fn position(&self, id: OpId) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    fn visible_before(&self, position: usize) -> usize {
        self.items[..position]
            .iter()
            .filter(|item| !item.deleted)
            .count()
    }

    /// Id of the visible character left of `index`, i.e. the origin a local
    /// insert at `index` attaches to.
    pub fn origin_for(&self, index: usize) -> Result<Option<OpId>, DocumentError> {
        if index > self.visible {
            return Err(DocumentError::IndexOutOfBounds {
                index,
                len: self.visible,
            });
        }
        if index == 0 {
            return Ok(None);
        }
        Ok(self
            .items
            .iter()
            .filter(|item| !item.deleted)
            .nth(index - 1)
            .map(|item| item.id))
    }

    /// Ids of `len` visible characters starting at `index`.
    pub fn visible_range(&self, index: usize, len: usize) -> Result<Vec<OpId>, DocumentError> {
        let end = index.saturating_add(len);
        if end > self.visible {
            return Err(DocumentError::IndexOutOfBounds {
                index: end,
                len: self.visible,
            });
        }
        Ok(self
            .items
            .iter()
            .filter(|item| !item.deleted)
            .skip(index)
            .take(len)
            .map(|item| item.id)
            .collect())
    }

    /// Places a character after its origin, skipping over concurrent
    /// siblings with a greater stamp. Returns the resulting visible index.
    pub fn integrate_insert(
        &mut self,
        id: OpId,
        stamp: Stamp,
        origin: Option<OpId>,
        ch: char,
    ) -> Result<usize, DocumentError> {
        let mut position = match origin {
            Some(origin) => self.position(origin).ok_or(DocumentError::UnknownItem(origin))? + 1,
            None => 0,
        };
        // Everything integrated after a later-stamped sibling lies in that
        // sibling's subtree, so it sorts before us as well.
        while position < self.items.len() && self.items[position].stamp > stamp {
            position += 1;
        }

        let index = self.visible_before(position);
        self.items.insert(
            position,
            Item {
                id,
                stamp,
                ch,
                deleted: false,
            },
        );
        self.visible += 1;
        Ok(index)
    }

    /// Tombstones `target`. Returns the visible index it occupied, or `None`
    /// when it was already deleted.
    pub fn integrate_delete(&mut self, target: OpId) -> Result<Option<usize>, DocumentError> {
        let position = self
            .position(target)
            .ok_or(DocumentError::UnknownItem(target))?;
        if self.items[position].deleted {
            return Ok(None);
        }
        let index = self.visible_before(position);
        self.items[position].deleted = true;
        self.visible -= 1;
        Ok(Some(index))
    }
}
