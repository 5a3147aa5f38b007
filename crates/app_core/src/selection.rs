//! Multi-selection over the visible file list

use crate::FileId;
use std::collections::HashSet;

/// Direction for moving a single selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Previous,
    Next,
}

/// Selected files plus the anchor used for shift-range selection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    selected: HashSet<FileId>,
    anchor: Option<FileId>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> &HashSet<FileId> {
        &self.selected
    }

    pub fn anchor(&self) -> Option<FileId> {
        self.anchor
    }

    pub fn contains(&self, id: FileId) -> bool {
        self.selected.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Selected ids in display order
    pub fn ordered(&self, order: &[FileId]) -> Vec<FileId> {
        order.iter().copied().filter(|id| self.selected.contains(id)).collect()
    }

    /// Flip one file and make it the anchor
    pub fn toggle(&mut self, id: FileId) {
        if !self.selected.remove(&id) {
            self.selected.insert(id);
        }
        self.anchor = Some(id);
    }

    /// Select the span between the anchor and `id`
    ///
    /// The selection is replaced by every id between the two positions in
    /// `order`, inclusive, and the anchor stays put. Without an anchor, or when
    /// either end is not visible, this is a plain toggle.
    pub fn range_select(&mut self, id: FileId, order: &[FileId]) {
        let span = self.anchor.and_then(|anchor| {
            let from = order.iter().position(|x| *x == anchor)?;
            let to = order.iter().position(|x| *x == id)?;
            Some((from.min(to), from.max(to)))
        });

        match span {
            Some((start, end)) => {
                self.selected = order[start..=end].iter().copied().collect();
            }
            None => self.toggle(id),
        }
    }

    /// Move a single selection to its neighbour in `order`
    ///
    /// Does nothing unless exactly one visible file is selected. Returns the
    /// newly selected id.
    pub fn step(&mut self, direction: Step, order: &[FileId]) -> Option<FileId> {
        if self.selected.len() != 1 {
            return None;
        }
        let current = *self.selected.iter().next()?;
        let index = order.iter().position(|x| *x == current)?;

        let next = match direction {
            Step::Previous => index.checked_sub(1)?,
            Step::Next => index + 1,
        };
        let id = *order.get(next)?;

        self.selected = HashSet::from([id]);
        self.anchor = Some(id);
        Some(id)
    }

    pub fn clear(&mut self) {
        self.selected.clear();
        self.anchor = None;
    }

    /// Drop files that left the board or the current context
    pub fn forget<'a, I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = &'a FileId>,
    {
        for id in ids {
            self.selected.remove(id);
            if self.anchor == Some(*id) {
                self.anchor = None;
            }
        }
    }
}
