use std::collections::BTreeSet;

use crate::model::CheckId;

/// Multi-select state for the check table.
///
/// Ids are kept ordered so bulk requests are issued deterministically.
#[derive(Debug, Clone, Default)]
pub struct SelectionTracker {
    ids: BTreeSet<CheckId>,
    select_all: bool,
}

impl SelectionTracker {
    pub fn toggle(&mut self, id: &CheckId, visible_count: usize) {
        if !self.ids.remove(id) {
            self.ids.insert(id.clone());
        }
        self.select_all = visible_count > 0 && self.ids.len() == visible_count;
    }

    pub fn toggle_all<'a, I>(&mut self, visible: I)
    where
        I: IntoIterator<Item = &'a CheckId>,
    {
        if self.select_all {
            self.clear();
            return;
        }
        self.ids = visible.into_iter().cloned().collect();
        self.select_all = !self.ids.is_empty();
    }

    /// Called whenever a new record collection arrives. Ids may refer to records that were
    /// renumbered or removed, so nothing survives.
    pub fn invalidate(&mut self) {
        self.clear();
    }

    /// Drops ids that are no longer visible (filter change) and recomputes select-all.
    pub fn retain_visible(&mut self, visible: &BTreeSet<CheckId>) {
        self.ids.retain(|id| visible.contains(id));
        self.select_all = !visible.is_empty() && self.ids.len() == visible.len();
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.select_all = false;
    }

    pub fn contains(&self, id: &CheckId) -> bool {
        self.ids.contains(id)
    }

    pub fn is_all_selected(&self) -> bool {
        self.select_all
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> Vec<CheckId> {
        self.ids.iter().cloned().collect()
    }
}
