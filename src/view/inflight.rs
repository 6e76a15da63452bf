use std::collections::HashSet;

use crate::model::CheckId;

/// What the row should show while a mutation for it is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAffordance {
    Checking,
    FolderMove,
    Updating,
    Idle,
}

/// Id sets owned by whoever issues mutations. The view only reads them.
#[derive(Debug, Clone, Default)]
pub struct InFlightSets {
    pub optimistic: HashSet<CheckId>,
    pub folder: HashSet<CheckId>,
    pub manual_check: HashSet<CheckId>,
}

impl InFlightSets {
    pub fn markers(&self) -> InFlightMarkers<'_> {
        InFlightMarkers {
            optimistic: &self.optimistic,
            folder: &self.folder,
            manual_check: &self.manual_check,
        }
    }

    pub fn settle<'a, I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = &'a CheckId>,
    {
        for id in ids {
            self.optimistic.remove(id);
            self.folder.remove(id);
            self.manual_check.remove(id);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.optimistic.is_empty() && self.folder.is_empty() && self.manual_check.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct InFlightMarkers<'a> {
    optimistic: &'a HashSet<CheckId>,
    folder: &'a HashSet<CheckId>,
    manual_check: &'a HashSet<CheckId>,
}

impl<'a> InFlightMarkers<'a> {
    pub fn is_optimistically_updating(&self, id: &CheckId) -> bool {
        self.optimistic.contains(id)
    }

    pub fn is_folder_updating(&self, id: &CheckId) -> bool {
        self.folder.contains(id)
    }

    pub fn is_manually_checking(&self, id: &CheckId) -> bool {
        self.manual_check.contains(id)
    }

    /// A folder-only move suppresses the generic update pulse so the row does not animate
    /// twice.
    pub fn affordance(&self, id: &CheckId) -> RowAffordance {
        if self.is_manually_checking(id) {
            RowAffordance::Checking
        } else if self.is_folder_updating(id) {
            RowAffordance::FolderMove
        } else if self.is_optimistically_updating(id) {
            RowAffordance::Updating
        } else {
            RowAffordance::Idle
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_move_wins_over_generic_update() {
        let id = CheckId::from("a");
        let mut sets = InFlightSets::default();
        sets.optimistic.insert(id.clone());
        sets.folder.insert(id.clone());
        assert_eq!(sets.markers().affordance(&id), RowAffordance::FolderMove);

        sets.folder.clear();
        assert_eq!(sets.markers().affordance(&id), RowAffordance::Updating);
    }

    #[test]
    fn manual_check_takes_precedence() {
        let id = CheckId::from("a");
        let mut sets = InFlightSets::default();
        sets.optimistic.insert(id.clone());
        sets.manual_check.insert(id.clone());
        assert_eq!(sets.markers().affordance(&id), RowAffordance::Checking);
    }

    #[test]
    fn settle_clears_all_sets() {
        let id = CheckId::from("a");
        let mut sets = InFlightSets::default();
        sets.optimistic.insert(id.clone());
        sets.manual_check.insert(id.clone());
        sets.settle([&id]);
        assert!(sets.is_empty());
        assert_eq!(sets.markers().affordance(&id), RowAffordance::Idle);
    }
}
