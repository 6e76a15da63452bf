use std::collections::BTreeSet;

use anyhow::Result;

use crate::app::actions::CheckMutations;
use crate::app::worker::MutationEvent;
use crate::bulk::{BulkEditDraft, BulkFields, IntervalUnit};
use crate::folders::{known_folders, FolderDialog, FolderPicker};
use crate::model::{CheckId, CheckRecord};
use crate::prefs::{PreferenceStore, TypedPreferences};
use crate::search::{filter_checks, parse_query, CheckQuery};
use crate::view::{
    group_checks, sort_checks, ColumnKey, DragController, GroupBy, InFlightMarkers, InFlightSets,
    ReorderMove, SelectionTracker, SortKey, ViewPreferences,
};

#[derive(Debug, Clone, Default)]
pub struct SearchState {
    pub active: bool,
    pub query: String,
    pub parsed: CheckQuery,
}

#[derive(Debug, Clone)]
pub struct BulkEditOverlay {
    pub draft: BulkEditDraft,
    pub ids: Vec<CheckId>,
    pub field_index: usize,
    /// Text being typed for the highlighted field, if any.
    pub input: Option<String>,
    pub error: Option<String>,
}

impl BulkEditOverlay {
    pub fn field(&self) -> BulkFields {
        BulkFields::ORDERED[self.field_index % BulkFields::ORDERED.len()]
    }

    pub fn move_field(&mut self, delta: isize) {
        let len = BulkFields::ORDERED.len() as isize;
        self.field_index = (self.field_index as isize + delta).rem_euclid(len) as usize;
        self.input = None;
        self.error = None;
    }

    /// Starts typing into the highlighted field, seeded with its current value.
    pub fn begin_input(&mut self) {
        let field = self.field();
        if field == BulkFields::CHECK_REGION {
            self.draft.cycle_region();
            self.draft.set_enabled(field, true);
            return;
        }
        let seed = if field == BulkFields::CHECK_FREQUENCY {
            self.draft.interval().to_string()
        } else if field == BulkFields::EXPECTED_STATUS_CODES {
            self.draft.status_codes().to_string()
        } else if field == BulkFields::DOWN_CONFIRMATION_ATTEMPTS {
            self.draft.attempts().to_string()
        } else {
            self.draft.timezone().display()
        };
        self.input = Some(seed);
        self.error = None;
    }

    /// Pushes typed text into the draft. Rejected input stays in the box with an error.
    pub fn commit_input(&mut self) {
        let Some(text) = self.input.take() else {
            return;
        };
        let field = self.field();
        let outcome = if field == BulkFields::CHECK_FREQUENCY {
            self.draft.set_interval_text(&text)
        } else if field == BulkFields::EXPECTED_STATUS_CODES {
            self.draft.set_status_codes(text.clone());
            Ok(())
        } else if field == BulkFields::DOWN_CONFIRMATION_ATTEMPTS {
            self.draft.set_attempts_text(&text)
        } else {
            crate::bulk::TimezoneChoice::parse(&text).map(|tz| self.draft.set_timezone(tz))
        };
        match outcome {
            Ok(()) => {
                self.draft.set_enabled(field, true);
                self.error = None;
            }
            Err(err) => {
                self.error = Some(err.to_string());
                self.input = Some(text);
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeleteOverlay {
    pub ids: Vec<CheckId>,
    pub label: String,
    from_selection: bool,
}

#[derive(Debug, Clone)]
pub enum OverlayState {
    BulkEdit(BulkEditOverlay),
    FolderPicker(FolderPicker),
    NewFolder(FolderDialog),
    ConfirmDelete(DeleteOverlay),
    Help,
}

/// One rendered line of the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewRow {
    Header {
        key: String,
        label: String,
        count: usize,
        collapsed: bool,
    },
    /// `position` counts rendered order, collapsed members included.
    Check { position: usize, id: CheckId },
}

#[derive(Debug, Clone)]
pub struct ChecklistState {
    checks: Vec<CheckRecord>,
    revision: u64,
    pub prefs: ViewPreferences,
    pub search: SearchState,
    pub max_results: usize,
    pub interval_unit: IntervalUnit,
    cursor: usize,
    selection: SelectionTracker,
    drag: DragController,
    pub in_flight: InFlightSets,
    pub overlay: Option<OverlayState>,
    pub status_message: Option<String>,
}

impl ChecklistState {
    pub fn new(prefs: ViewPreferences, interval_unit: IntervalUnit, max_results: usize) -> Self {
        Self {
            checks: Vec::new(),
            revision: 0,
            prefs,
            search: SearchState::default(),
            max_results,
            interval_unit,
            cursor: 0,
            selection: SelectionTracker::default(),
            drag: DragController::default(),
            in_flight: InFlightSets::default(),
            overlay: None,
            status_message: None,
        }
    }

    /// Accepts a new collection from the record source. Selection never survives this,
    /// even when the ids are unchanged.
    pub fn replace_checks(&mut self, checks: Vec<CheckRecord>) {
        self.checks = checks;
        self.revision += 1;
        self.selection.invalidate();
        if !self.drag_enabled() {
            self.drag.end();
        }
        self.clamp_cursor();
    }

    pub fn checks(&self) -> &[CheckRecord] {
        &self.checks
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn selection(&self) -> &SelectionTracker {
        &self.selection
    }

    pub fn drag(&self) -> &DragController {
        &self.drag
    }

    pub fn markers(&self) -> InFlightMarkers<'_> {
        self.in_flight.markers()
    }

    pub fn set_status_message<S: Into<String>>(&mut self, message: Option<S>) {
        self.status_message = message.map(Into::into);
    }

    pub fn clear_status_message(&mut self) {
        self.status_message = None;
    }

    /// Filtered, then sorted, then capped at `max_results`.
    pub fn visible_checks(&self) -> Vec<&CheckRecord> {
        let filtered = filter_checks(&self.checks, &self.search.parsed, None);
        let mut ordered = sort_checks(filtered, self.prefs.sort_by);
        ordered.truncate(self.max_results.max(1));
        ordered
    }

    pub fn visible_ids(&self) -> Vec<CheckId> {
        self.visible_checks()
            .into_iter()
            .map(|record| record.id.clone())
            .collect()
    }

    pub fn rows(&self) -> Vec<ViewRow> {
        let visible = self.visible_checks();
        match self.prefs.group_by {
            GroupBy::None => visible
                .iter()
                .enumerate()
                .map(|(position, record)| ViewRow::Check {
                    position,
                    id: record.id.clone(),
                })
                .collect(),
            GroupBy::Folder => {
                let mut rows = Vec::new();
                let mut position = 0;
                for group in group_checks(&visible) {
                    let collapsed = self.prefs.collapsed.contains(&group.key);
                    rows.push(ViewRow::Header {
                        key: group.key.clone(),
                        label: group.label.clone(),
                        count: group.members.len(),
                        collapsed,
                    });
                    for record in &group.members {
                        if !collapsed {
                            rows.push(ViewRow::Check {
                                position,
                                id: record.id.clone(),
                            });
                        }
                        position += 1;
                    }
                }
                rows
            }
        }
    }

    pub fn find_check(&self, id: &CheckId) -> Option<&CheckRecord> {
        self.checks.iter().find(|record| &record.id == id)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn set_cursor(&mut self, row: usize) {
        self.cursor = row;
        self.clamp_cursor();
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let len = self.rows().len();
        if len == 0 {
            self.cursor = 0;
            return;
        }
        let next = (self.cursor as isize + delta).clamp(0, len as isize - 1);
        self.cursor = next as usize;
    }

    fn clamp_cursor(&mut self) {
        let len = self.rows().len();
        if len == 0 {
            self.cursor = 0;
        } else if self.cursor >= len {
            self.cursor = len - 1;
        }
    }

    pub fn cursor_row(&self) -> Option<ViewRow> {
        self.rows().into_iter().nth(self.cursor)
    }

    pub fn cursor_check_id(&self) -> Option<CheckId> {
        match self.cursor_row()? {
            ViewRow::Check { id, .. } => Some(id),
            ViewRow::Header { .. } => None,
        }
    }

    /// Position of the cursor row within the visible sequence.
    pub fn cursor_position(&self) -> Option<usize> {
        match self.cursor_row()? {
            ViewRow::Check { position, .. } => Some(position),
            ViewRow::Header { .. } => None,
        }
    }

    fn move_cursor_to_position(&mut self, target: usize) {
        if let Some(row) = self
            .rows()
            .iter()
            .position(|row| matches!(row, ViewRow::Check { position, .. } if *position == target))
        {
            self.cursor = row;
        }
    }

    // Selection

    pub fn toggle_selection_at_cursor(&mut self) {
        let Some(id) = self.cursor_check_id() else {
            return;
        };
        let visible = self.visible_checks().len();
        self.selection.toggle(&id, visible);
    }

    /// Selects every visible check, including those inside collapsed groups.
    pub fn toggle_select_all(&mut self) {
        let ids = self.visible_ids();
        self.selection.toggle_all(ids.iter());
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Selected ids, or the cursor row when nothing is selected.
    fn targets(&self) -> (Vec<CheckId>, bool) {
        if self.selection.is_empty() {
            (self.cursor_check_id().into_iter().collect(), false)
        } else {
            (self.selection.ids(), true)
        }
    }

    // Search

    pub fn begin_search(&mut self) {
        self.search.active = true;
    }

    pub fn finish_search(&mut self) {
        self.search.active = false;
    }

    pub fn push_search_char(&mut self, ch: char) {
        self.search.query.push(ch);
        self.apply_search();
    }

    pub fn pop_search_char(&mut self) {
        if self.search.query.pop().is_some() {
            self.apply_search();
        }
    }

    pub fn set_search_query(&mut self, query: &str) {
        self.search.query = query.to_string();
        self.apply_search();
    }

    pub fn cancel_search(&mut self) {
        self.search.active = false;
        if !self.search.query.is_empty() {
            self.search.query.clear();
            self.apply_search();
        }
    }

    fn apply_search(&mut self) {
        self.search.parsed = parse_query(&self.search.query);
        let visible: BTreeSet<CheckId> = self.visible_ids().into_iter().collect();
        self.selection.retain_visible(&visible);
        if !self.drag_enabled() {
            self.drag.end();
        }
        self.clamp_cursor();
    }

    // Preferences

    pub fn cycle_sort(&mut self, store: &dyn PreferenceStore) -> Result<SortKey> {
        let next = self.prefs.sort_by.next();
        self.set_sort(next, store)?;
        Ok(next)
    }

    pub fn set_sort(&mut self, key: SortKey, store: &dyn PreferenceStore) -> Result<()> {
        self.prefs.sort_by = key;
        self.after_view_change();
        store.set_sort_by(key)
    }

    pub fn toggle_group(&mut self, store: &dyn PreferenceStore) -> Result<GroupBy> {
        let next = self.prefs.group_by.toggled();
        self.prefs.group_by = next;
        self.after_view_change();
        store.set_group_by(next)?;
        Ok(next)
    }

    pub fn toggle_column(&mut self, key: ColumnKey, store: &dyn PreferenceStore) -> Result<bool> {
        let visible = self.prefs.columns.toggle(key);
        store.set_columns(&self.prefs.columns)?;
        Ok(visible)
    }

    /// Collapses or expands the group under the cursor.
    pub fn toggle_collapse_at_cursor(&mut self, store: &dyn PreferenceStore) -> Result<bool> {
        let Some(key) = self.cursor_group_key() else {
            return Ok(false);
        };
        self.toggle_collapse(&key, store)
    }

    pub fn toggle_collapse(&mut self, key: &str, store: &dyn PreferenceStore) -> Result<bool> {
        let collapsed = self.prefs.collapsed.toggle(key);
        if let Some(row) = self
            .rows()
            .iter()
            .position(|row| matches!(row, ViewRow::Header { key: k, .. } if k == key))
        {
            self.cursor = row;
        }
        store.set_collapsed(&self.prefs.collapsed)?;
        Ok(collapsed)
    }

    fn cursor_group_key(&self) -> Option<String> {
        if self.prefs.group_by != GroupBy::Folder {
            return None;
        }
        let rows = self.rows();
        rows[..=self.cursor.min(rows.len().checked_sub(1)?)]
            .iter()
            .rev()
            .find_map(|row| match row {
                ViewRow::Header { key, .. } => Some(key.clone()),
                ViewRow::Check { .. } => None,
            })
    }

    fn after_view_change(&mut self) {
        if !self.drag_enabled() {
            self.drag.end();
        }
        self.clamp_cursor();
    }

    // Drag reordering

    pub fn drag_enabled(&self) -> bool {
        self.prefs.allows_reorder() && self.search.parsed.is_empty()
    }

    pub fn begin_drag(&mut self, position: usize) -> bool {
        let len = self.visible_checks().len();
        let enabled = self.drag_enabled();
        self.drag.start(position, len, enabled)
    }

    pub fn begin_drag_at_cursor(&mut self) -> bool {
        match self.cursor_position() {
            Some(position) => self.begin_drag(position),
            None => false,
        }
    }

    /// Feeds a drag-over. A resulting move is sent to `mutations` and mirrored locally
    /// so the rendered order follows the pointer before the store answers.
    pub fn drag_over(
        &mut self,
        position: usize,
        mutations: &dyn CheckMutations,
    ) -> Result<Option<ReorderMove>> {
        let len = self.visible_checks().len();
        let enabled = self.drag_enabled();
        let Some(movement) = self.drag.over(position, len, enabled) else {
            return Ok(None);
        };
        mutations.reorder(movement.from, movement.to)?;
        self.apply_local_reorder(movement);
        self.move_cursor_to_position(movement.to);
        Ok(Some(movement))
    }

    /// Keyboard drag: moves the held row one step.
    pub fn drag_step(
        &mut self,
        delta: isize,
        mutations: &dyn CheckMutations,
    ) -> Result<Option<ReorderMove>> {
        let Some(target) = self.drag.target() else {
            return Ok(None);
        };
        let next = target as isize + delta;
        if next < 0 {
            return Ok(None);
        }
        self.drag_over(next as usize, mutations)
    }

    pub fn end_drag(&mut self) {
        self.drag.end();
    }

    fn apply_local_reorder(&mut self, movement: ReorderMove) {
        let mut ordered: Vec<CheckRecord> = sort_checks(&self.checks, SortKey::Custom)
            .into_iter()
            .cloned()
            .collect();
        if movement.from >= ordered.len() || movement.to >= ordered.len() {
            return;
        }
        let moved = ordered.remove(movement.from);
        ordered.insert(movement.to, moved);
        for (index, record) in ordered.iter_mut().enumerate() {
            record.order_index = Some(index as i64);
        }
        self.checks = ordered;
    }

    // Mutations

    pub fn toggle_status_at_cursor(&mut self, mutations: &dyn CheckMutations) -> Result<()> {
        let Some(id) = self.cursor_check_id() else {
            return Ok(());
        };
        let disabled = self.find_check(&id).map(|record| !record.disabled).unwrap_or(true);
        mutations.toggle_status(&id, disabled)?;
        self.in_flight.optimistic.insert(id);
        Ok(())
    }

    /// Issues one bulk status change for the selection and clears it.
    pub fn bulk_toggle_status(
        &mut self,
        disabled: bool,
        mutations: &dyn CheckMutations,
    ) -> Result<Vec<CheckId>> {
        let ids = self.selection.ids();
        if ids.is_empty() {
            return Ok(ids);
        }
        mutations.bulk_toggle_status(&ids, disabled)?;
        self.in_flight.optimistic.extend(ids.iter().cloned());
        self.selection.clear();
        Ok(ids)
    }

    pub fn check_now_at_cursor(&mut self, mutations: &dyn CheckMutations) -> Result<()> {
        let Some(id) = self.cursor_check_id() else {
            return Ok(());
        };
        if self.in_flight.manual_check.contains(&id) {
            return Ok(());
        }
        mutations.check_now(&id)?;
        self.in_flight.manual_check.insert(id);
        Ok(())
    }

    pub fn request_delete(&mut self) {
        let (ids, from_selection) = self.targets();
        let label = match ids.as_slice() {
            [] => return,
            [single] => self
                .find_check(single)
                .map(|record| record.name.clone())
                .unwrap_or_else(|| single.to_string()),
            many => format!("{} checks", many.len()),
        };
        self.overlay = Some(OverlayState::ConfirmDelete(DeleteOverlay {
            ids,
            label,
            from_selection,
        }));
    }

    pub fn confirm_delete(&mut self, mutations: &dyn CheckMutations) -> Result<Vec<CheckId>> {
        let Some(OverlayState::ConfirmDelete(overlay)) = self.overlay.take() else {
            return Ok(Vec::new());
        };
        match overlay.ids.as_slice() {
            [single] if !overlay.from_selection => mutations.delete(single)?,
            ids => mutations.bulk_delete(ids)?,
        }
        self.in_flight.optimistic.extend(overlay.ids.iter().cloned());
        if overlay.from_selection {
            self.selection.clear();
        }
        Ok(overlay.ids)
    }

    pub fn open_bulk_edit(&mut self) -> bool {
        if self.selection.is_empty() {
            self.set_status_message(Some("Select checks before bulk editing"));
            return false;
        }
        self.overlay = Some(OverlayState::BulkEdit(BulkEditOverlay {
            draft: BulkEditDraft::new(self.interval_unit),
            ids: self.selection.ids(),
            field_index: 0,
            input: None,
            error: None,
        }));
        true
    }

    pub fn bulk_edit_mut(&mut self) -> Option<&mut BulkEditOverlay> {
        match self.overlay.as_mut() {
            Some(OverlayState::BulkEdit(overlay)) => Some(overlay),
            _ => None,
        }
    }

    /// Sends the bulk-edit diff. An empty diff sends nothing and leaves the editor open.
    pub fn apply_bulk_edit(&mut self, mutations: &dyn CheckMutations) -> Result<bool> {
        let Some(overlay) = self.bulk_edit_mut() else {
            return Ok(false);
        };
        let patch = overlay.draft.build_diff();
        if patch.is_empty() {
            overlay.error = Some("Enable at least one field".to_string());
            return Ok(false);
        }
        let ids = overlay.ids.clone();
        mutations.bulk_update_settings(&ids, &patch)?;
        self.in_flight.optimistic.extend(ids);
        self.overlay = None;
        self.selection.clear();
        Ok(true)
    }

    pub fn open_folder_picker(&mut self) -> bool {
        let (targets, _) = self.targets();
        if targets.is_empty() {
            return false;
        }
        self.overlay = Some(OverlayState::FolderPicker(FolderPicker::new(
            targets,
            known_folders(&self.checks),
        )));
        true
    }

    pub fn folder_picker_mut(&mut self) -> Option<&mut FolderPicker> {
        match self.overlay.as_mut() {
            Some(OverlayState::FolderPicker(picker)) => Some(picker),
            _ => None,
        }
    }

    pub fn commit_folder_pick(&mut self, mutations: &dyn CheckMutations) -> Result<Vec<CheckId>> {
        let Some(OverlayState::FolderPicker(picker)) = self.overlay.take() else {
            return Ok(Vec::new());
        };
        let folder = picker.selected_folder().map(str::to_string);
        for id in picker.targets() {
            mutations.set_folder(id, folder.as_deref())?;
            self.in_flight.folder.insert(id.clone());
        }
        if !self.selection.is_empty() {
            self.selection.clear();
        }
        Ok(picker.targets().to_vec())
    }

    pub fn open_new_folder_dialog(&mut self) -> bool {
        let origin = match self.overlay.take() {
            Some(OverlayState::FolderPicker(picker)) => picker.targets().first().cloned(),
            other => {
                self.overlay = other;
                self.cursor_check_id()
            }
        };
        let Some(origin) = origin else {
            return false;
        };
        self.overlay = Some(OverlayState::NewFolder(FolderDialog::new(origin)));
        true
    }

    pub fn folder_dialog_mut(&mut self) -> Option<&mut FolderDialog> {
        match self.overlay.as_mut() {
            Some(OverlayState::NewFolder(dialog)) => Some(dialog),
            _ => None,
        }
    }

    /// Creates the folder by assigning the origin check to it. A blank name keeps the
    /// dialog open and sends nothing.
    pub fn commit_folder_dialog(&mut self, mutations: &dyn CheckMutations) -> Result<bool> {
        let Some(dialog) = self.folder_dialog_mut() else {
            return Ok(false);
        };
        let Some(name) = dialog.committable_name() else {
            self.set_status_message(Some("Folder name cannot be empty"));
            return Ok(false);
        };
        let origin = dialog.origin().clone();
        mutations.set_folder(&origin, Some(&name))?;
        self.in_flight.folder.insert(origin);
        self.overlay = None;
        Ok(true)
    }

    pub fn close_overlay(&mut self) {
        self.overlay = None;
    }

    // Worker feedback

    /// Settles in-flight markers and adopts the snapshot carried by the event. Returns
    /// `false` on failure so the caller can reload from storage.
    pub fn on_mutation_event(&mut self, event: MutationEvent) -> bool {
        self.in_flight.settle(event.ids());
        match event {
            MutationEvent::Applied { snapshot, .. } => {
                self.replace_checks(snapshot);
                true
            }
            MutationEvent::Failed { kind, message, .. } => {
                self.set_status_message(Some(format!("{kind} failed: {message}")));
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::actions::MutationRequest;
    use crate::bulk::CheckPatch;
    use crate::prefs::{MemoryPreferences, PreferenceKey};
    use assert_matches::assert_matches;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingMutations {
        calls: Mutex<Vec<MutationRequest>>,
    }

    impl RecordingMutations {
        fn calls(&self) -> Vec<MutationRequest> {
            self.calls.lock().clone()
        }

        fn record(&self, request: MutationRequest) -> Result<()> {
            self.calls.lock().push(request);
            Ok(())
        }
    }

    impl CheckMutations for RecordingMutations {
        fn reorder(&self, from: usize, to: usize) -> Result<()> {
            self.record(MutationRequest::Reorder { from, to })
        }

        fn delete(&self, id: &CheckId) -> Result<()> {
            self.record(MutationRequest::Delete(id.clone()))
        }

        fn bulk_delete(&self, ids: &[CheckId]) -> Result<()> {
            self.record(MutationRequest::BulkDelete(ids.to_vec()))
        }

        fn toggle_status(&self, id: &CheckId, disabled: bool) -> Result<()> {
            self.record(MutationRequest::ToggleStatus {
                id: id.clone(),
                disabled,
            })
        }

        fn bulk_toggle_status(&self, ids: &[CheckId], disabled: bool) -> Result<()> {
            self.record(MutationRequest::BulkToggleStatus {
                ids: ids.to_vec(),
                disabled,
            })
        }

        fn set_folder(&self, id: &CheckId, folder: Option<&str>) -> Result<()> {
            self.record(MutationRequest::SetFolder {
                id: id.clone(),
                folder: folder.map(str::to_string),
            })
        }

        fn bulk_update_settings(&self, ids: &[CheckId], patch: &CheckPatch) -> Result<()> {
            self.record(MutationRequest::BulkUpdateSettings {
                ids: ids.to_vec(),
                patch: patch.clone(),
            })
        }

        fn check_now(&self, id: &CheckId) -> Result<()> {
            self.record(MutationRequest::CheckNow(id.clone()))
        }
    }

    fn check(id: &str, order_index: Option<i64>) -> CheckRecord {
        let mut record = CheckRecord::new(id, id, &format!("https://{id}.test"));
        record.order_index = order_index;
        record
    }

    fn in_folder(id: &str, order_index: i64, folder: &str) -> CheckRecord {
        let mut record = check(id, Some(order_index));
        record.folder = Some(folder.to_string());
        record
    }

    fn state_with(checks: Vec<CheckRecord>) -> ChecklistState {
        let mut state = ChecklistState::new(ViewPreferences::default(), IntervalUnit::Minutes, 500);
        state.replace_checks(checks);
        state
    }

    fn visible(state: &ChecklistState) -> Vec<String> {
        state
            .visible_checks()
            .iter()
            .map(|record| record.id.to_string())
            .collect()
    }

    #[test]
    fn select_all_then_bulk_disable_issues_one_call() -> anyhow::Result<()> {
        let mutations = RecordingMutations::default();
        let mut state = state_with(vec![check("a", Some(1)), check("b", Some(0))]);
        assert_eq!(visible(&state), ["b", "a"]);

        state.toggle_select_all();
        assert!(state.selection().is_all_selected());
        assert_eq!(state.selection().ids(), [CheckId::from("a"), CheckId::from("b")]);

        let issued = state.bulk_toggle_status(true, &mutations)?;
        assert_eq!(issued.len(), 2);
        assert_eq!(
            mutations.calls(),
            [MutationRequest::BulkToggleStatus {
                ids: vec![CheckId::from("a"), CheckId::from("b")],
                disabled: true,
            }]
        );
        assert!(state.selection().is_empty());
        assert!(!state.selection().is_all_selected());
        assert!(state.markers().is_optimistically_updating(&CheckId::from("a")));
        Ok(())
    }

    #[test]
    fn new_collection_resets_selection_even_with_same_ids() {
        let records = vec![check("1", None), check("2", None)];
        let mut state = state_with(records.clone());
        state.toggle_select_all();
        assert_eq!(state.selection().len(), 2);
        state.replace_checks(records);
        assert!(state.selection().is_empty());
        assert!(!state.selection().is_all_selected());
        assert_eq!(state.revision(), 2);
    }

    #[test]
    fn empty_bulk_edit_sends_nothing() -> anyhow::Result<()> {
        let mutations = RecordingMutations::default();
        let mut state = state_with(vec![check("a", None)]);
        assert!(!state.open_bulk_edit());

        state.toggle_select_all();
        assert!(state.open_bulk_edit());
        assert!(!state.apply_bulk_edit(&mutations)?);
        assert!(mutations.calls().is_empty());
        assert_matches!(state.overlay, Some(OverlayState::BulkEdit(_)));
        assert_eq!(state.selection().len(), 1);
        Ok(())
    }

    #[test]
    fn applied_bulk_edit_clears_selection_and_closes() -> anyhow::Result<()> {
        let mutations = RecordingMutations::default();
        let mut state = state_with(vec![check("a", None), check("b", None)]);
        state.toggle_select_all();
        state.open_bulk_edit();
        let overlay = state.bulk_edit_mut().expect("overlay");
        overlay.input = Some("abc 404, 700".into());
        overlay.field_index = 1;
        overlay.commit_input();
        assert!(state.apply_bulk_edit(&mutations)?);
        assert_matches!(
            mutations.calls().as_slice(),
            [MutationRequest::BulkUpdateSettings { patch, .. }]
                if patch.expected_status_codes == Some(vec![404])
        );
        assert!(state.overlay.is_none());
        assert!(state.selection().is_empty());
        Ok(())
    }

    #[test]
    fn rejected_attempts_stay_in_the_input() {
        let mut state = state_with(vec![check("a", None)]);
        state.toggle_select_all();
        state.open_bulk_edit();
        let overlay = state.bulk_edit_mut().expect("overlay");
        overlay.field_index = 2;
        overlay.input = Some("150".into());
        overlay.commit_input();
        assert!(overlay.error.is_some());
        assert_eq!(overlay.input.as_deref(), Some("150"));
        assert!(!overlay.draft.is_enabled(BulkFields::DOWN_CONFIRMATION_ATTEMPTS));
    }

    #[test]
    fn drag_is_inert_outside_custom_ungrouped_order() -> anyhow::Result<()> {
        let mutations = RecordingMutations::default();
        let store = MemoryPreferences::new();
        let mut state = state_with(vec![check("a", Some(0)), check("b", Some(1)), check("c", Some(2))]);

        state.set_sort(SortKey::NameAsc, &store)?;
        assert!(!state.begin_drag(0));
        assert_eq!(state.drag_over(2, &mutations)?, None);

        state.set_sort(SortKey::Custom, &store)?;
        state.toggle_group(&store)?;
        assert!(!state.begin_drag(0));
        assert_eq!(state.drag_over(1, &mutations)?, None);

        assert!(mutations.calls().is_empty());
        Ok(())
    }

    #[test]
    fn drag_reorders_live_and_drop_emits_nothing() -> anyhow::Result<()> {
        let mutations = RecordingMutations::default();
        let mut state = state_with(vec![check("a", Some(0)), check("b", Some(1)), check("c", Some(2))]);

        assert!(state.begin_drag(0));
        assert_eq!(state.drag_over(0, &mutations)?, None);
        assert_eq!(
            state.drag_over(1, &mutations)?,
            Some(ReorderMove { from: 0, to: 1 })
        );
        assert_eq!(
            state.drag_over(2, &mutations)?,
            Some(ReorderMove { from: 1, to: 2 })
        );
        assert_eq!(visible(&state), ["b", "c", "a"]);
        assert_eq!(state.drag_over(7, &mutations)?, None);
        state.end_drag();

        assert_eq!(
            mutations.calls(),
            [
                MutationRequest::Reorder { from: 0, to: 1 },
                MutationRequest::Reorder { from: 1, to: 2 },
            ]
        );
        Ok(())
    }

    #[test]
    fn keyboard_drag_follows_the_cursor() -> anyhow::Result<()> {
        let mutations = RecordingMutations::default();
        let mut state = state_with(vec![check("a", Some(0)), check("b", Some(1))]);
        assert!(state.begin_drag_at_cursor());
        state.drag_step(1, &mutations)?;
        assert_eq!(state.cursor(), 1);
        assert_eq!(state.cursor_check_id(), Some(CheckId::from("a")));
        assert_eq!(state.drag_step(-5, &mutations)?, None);
        Ok(())
    }

    #[test]
    fn search_filter_disables_drag_and_prunes_selection() {
        let mut state = state_with(vec![check("api", Some(0)), check("web", Some(1))]);
        state.toggle_select_all();
        state.set_search_query("api");
        assert_eq!(visible(&state), ["api"]);
        assert_eq!(state.selection().ids(), [CheckId::from("api")]);
        assert!(state.selection().is_all_selected());
        assert!(!state.drag_enabled());
        state.cancel_search();
        assert!(state.drag_enabled());
    }

    #[test]
    fn collapsed_groups_hide_rows_but_stay_selectable() -> anyhow::Result<()> {
        let store = MemoryPreferences::new();
        let mut state = state_with(vec![
            in_folder("a", 0, "Ops"),
            check("b", Some(1)),
            in_folder("c", 2, "Billing"),
        ]);
        state.toggle_group(&store)?;
        let rows = state.rows();
        assert_matches!(&rows[0], ViewRow::Header { key, .. } if key == "__unsorted__");
        assert_eq!(rows.len(), 6);

        state.toggle_collapse("Ops", &store)?;
        let rows = state.rows();
        assert_eq!(rows.len(), 5);
        assert!(!rows.contains(&ViewRow::Check {
            position: 2,
            id: CheckId::from("a")
        }));
        assert!(store.read(PreferenceKey::CollapsedFolders)?.is_some());

        state.toggle_select_all();
        assert_eq!(state.selection().len(), 3);
        Ok(())
    }

    #[test]
    fn collapse_at_cursor_uses_enclosing_header() -> anyhow::Result<()> {
        let store = MemoryPreferences::new();
        let mut state = state_with(vec![in_folder("a", 0, "Ops"), in_folder("b", 1, "Ops")]);
        state.toggle_group(&store)?;
        state.set_cursor(2);
        assert!(state.toggle_collapse_at_cursor(&store)?);
        assert_eq!(state.rows().len(), 1);
        assert_eq!(state.cursor(), 0);
        Ok(())
    }

    #[test]
    fn blank_folder_name_keeps_dialog_open() -> anyhow::Result<()> {
        let mutations = RecordingMutations::default();
        let mut state = state_with(vec![check("a", None)]);
        assert!(state.open_new_folder_dialog());
        state.folder_dialog_mut().expect("dialog").set_draft("   ");
        assert!(!state.commit_folder_dialog(&mutations)?);
        assert_matches!(state.overlay, Some(OverlayState::NewFolder(_)));
        assert!(mutations.calls().is_empty());

        state.folder_dialog_mut().expect("dialog").set_draft("  My   Folder ");
        assert!(state.commit_folder_dialog(&mutations)?);
        assert!(state.overlay.is_none());
        assert_eq!(
            mutations.calls(),
            [MutationRequest::SetFolder {
                id: CheckId::from("a"),
                folder: Some("My Folder".into()),
            }]
        );
        assert!(state.markers().is_folder_updating(&CheckId::from("a")));
        Ok(())
    }

    #[test]
    fn folder_picker_assigns_every_selected_check() -> anyhow::Result<()> {
        let mutations = RecordingMutations::default();
        let mut state = state_with(vec![in_folder("a", 0, "Ops"), check("b", Some(1))]);
        state.toggle_select_all();
        assert!(state.open_folder_picker());
        state.folder_picker_mut().expect("picker").move_cursor(1);
        let moved = state.commit_folder_pick(&mutations)?;
        assert_eq!(moved.len(), 2);
        assert!(mutations.calls().iter().all(|call| matches!(
            call,
            MutationRequest::SetFolder { folder: Some(name), .. } if name == "Ops"
        )));
        assert!(state.selection().is_empty());
        Ok(())
    }

    #[test]
    fn single_delete_goes_through_confirmation() -> anyhow::Result<()> {
        let mutations = RecordingMutations::default();
        let mut state = state_with(vec![check("a", None)]);
        state.request_delete();
        assert_matches!(&state.overlay, Some(OverlayState::ConfirmDelete(o)) if o.label == "a");
        state.confirm_delete(&mutations)?;
        assert_eq!(mutations.calls(), [MutationRequest::Delete(CheckId::from("a"))]);
        Ok(())
    }

    #[test]
    fn worker_events_settle_markers() -> anyhow::Result<()> {
        let mutations = RecordingMutations::default();
        let mut state = state_with(vec![check("a", None)]);
        state.check_now_at_cursor(&mutations)?;
        state.check_now_at_cursor(&mutations)?;
        assert_eq!(mutations.calls().len(), 1);
        assert!(state.markers().is_manually_checking(&CheckId::from("a")));

        let adopted = state.on_mutation_event(MutationEvent::Applied {
            kind: crate::app::actions::MutationKind::CheckNow,
            ids: vec![CheckId::from("a")],
            snapshot: vec![check("a", None)],
        });
        assert!(adopted);
        assert!(state.in_flight.is_empty());
        Ok(())
    }

    #[test]
    fn preference_changes_are_persisted_individually() -> anyhow::Result<()> {
        let store = MemoryPreferences::new();
        let mut state = state_with(vec![]);
        assert_eq!(state.cycle_sort(&store)?, SortKey::NameAsc);
        assert!(!state.toggle_column(ColumnKey::Region, &store)?);
        let view = store.load_view(&ViewPreferences::default());
        assert_eq!(view.sort_by, SortKey::NameAsc);
        assert!(!view.columns.is_visible(ColumnKey::Region));
        assert_eq!(view.group_by, GroupBy::None);
        Ok(())
    }
}
