//! Presentation policy for the check table: ordering, grouping, selection, drag reordering,
//! in-flight markers and column visibility. Everything here is independent of the terminal.

pub mod columns;
pub mod drag;
pub mod group;
pub mod inflight;
pub mod selection;
pub mod sort;

pub use columns::{ColumnKey, ColumnVisibility};
pub use drag::{DragController, DragPhase, ReorderMove};
pub use group::{
    group_checks, CheckGroup, CollapsedFolders, GroupBy, UNSORTED_GROUP_KEY, UNSORTED_GROUP_LABEL,
};
pub use inflight::{InFlightMarkers, InFlightSets, RowAffordance};
pub use selection::SelectionTracker;
pub use sort::{locale_cmp, sort_checks, sort_checks_raw, SortKey};

/// User view choices. Each field is persisted under its own preference key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewPreferences {
    pub sort_by: SortKey,
    pub group_by: GroupBy,
    pub columns: ColumnVisibility,
    pub collapsed: CollapsedFolders,
}

impl ViewPreferences {
    /// Manual reordering only makes sense against the raw custom order.
    pub fn allows_reorder(&self) -> bool {
        self.sort_by == SortKey::Custom && self.group_by == GroupBy::None
    }
}
