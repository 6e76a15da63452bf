use crate::model::{CheckId, CheckRecord};
use crate::view::locale_cmp;

pub const MAX_FOLDER_NAME_CHARS: usize = 48;

/// Canonical folder label: whitespace runs collapsed, trimmed and capped at
/// [`MAX_FOLDER_NAME_CHARS`]. `None` when nothing is left.
pub fn normalize_folder_name(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let truncated: String = collapsed.chars().take(MAX_FOLDER_NAME_CHARS).collect();
    let trimmed = truncated.trim_end();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Distinct folder labels in the collection, locale ordered.
pub fn known_folders(records: &[CheckRecord]) -> Vec<String> {
    let mut folders: Vec<String> = Vec::new();
    for label in records.iter().filter_map(CheckRecord::folder_label) {
        if !folders.iter().any(|existing| existing == label) {
            folders.push(label.to_string());
        }
    }
    folders.sort_by(|a, b| locale_cmp(a, b));
    folders
}

/// "New folder" dialog opened from a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderDialog {
    origin: CheckId,
    draft: String,
}

impl FolderDialog {
    pub fn new(origin: CheckId) -> Self {
        Self {
            origin,
            draft: String::new(),
        }
    }

    pub fn origin(&self) -> &CheckId {
        &self.origin
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn push_char(&mut self, ch: char) {
        self.draft.push(ch);
    }

    pub fn pop_char(&mut self) {
        self.draft.pop();
    }

    pub fn set_draft<S: Into<String>>(&mut self, draft: S) {
        self.draft = draft.into();
    }

    /// Normalised name to commit, or `None` while the draft is blank.
    pub fn committable_name(&self) -> Option<String> {
        normalize_folder_name(&self.draft)
    }
}

/// Picker over existing folders. Entry 0 is always "Unassigned".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderPicker {
    targets: Vec<CheckId>,
    options: Vec<String>,
    cursor: usize,
}

impl FolderPicker {
    pub const UNASSIGNED_LABEL: &'static str = "Unassigned";

    pub fn new(targets: Vec<CheckId>, folders: Vec<String>) -> Self {
        Self {
            targets,
            options: folders,
            cursor: 0,
        }
    }

    pub fn targets(&self) -> &[CheckId] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.options.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        std::iter::once(Self::UNASSIGNED_LABEL).chain(self.options.iter().map(String::as_str))
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let len = self.len() as isize;
        self.cursor = (self.cursor as isize + delta).rem_euclid(len) as usize;
    }

    /// Folder for the highlighted entry; `None` means unassign.
    pub fn selected_folder(&self) -> Option<&str> {
        match self.cursor {
            0 => None,
            idx => self.options.get(idx - 1).map(String::as_str),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_runs_collapse() {
        assert_eq!(
            normalize_folder_name("  My   Folder  ").as_deref(),
            Some("My Folder")
        );
        assert_eq!(normalize_folder_name("a\t\nb").as_deref(), Some("a b"));
    }

    #[test]
    fn blank_names_are_rejected() {
        assert_eq!(normalize_folder_name("   "), None);
        assert_eq!(normalize_folder_name(""), None);
        let mut dialog = FolderDialog::new(CheckId::from("a"));
        dialog.set_draft(" \t ");
        assert_eq!(dialog.committable_name(), None);
    }

    #[test]
    fn long_names_are_truncated_without_trailing_space() {
        let raw = format!("{} tail", "x".repeat(47));
        let name = normalize_folder_name(&raw).expect("name");
        assert_eq!(name, "x".repeat(47));

        let raw = "é".repeat(60);
        assert_eq!(
            normalize_folder_name(&raw).expect("name").chars().count(),
            MAX_FOLDER_NAME_CHARS
        );
    }

    #[test]
    fn known_folders_are_distinct_and_sorted() {
        let mut a = CheckRecord::new("a", "a", "https://a.test");
        a.folder = Some("ops".into());
        let mut b = CheckRecord::new("b", "b", "https://b.test");
        b.folder = Some(" Billing ".into());
        let mut c = CheckRecord::new("c", "c", "https://c.test");
        c.folder = Some("ops".into());
        let d = CheckRecord::new("d", "d", "https://d.test");
        assert_eq!(known_folders(&[a, b, c, d]), ["Billing", "ops"]);
    }

    #[test]
    fn picker_wraps_and_starts_on_unassigned() {
        let mut picker = FolderPicker::new(vec![CheckId::from("a")], vec!["Ops".into()]);
        assert_eq!(picker.selected_folder(), None);
        picker.move_cursor(1);
        assert_eq!(picker.selected_folder(), Some("Ops"));
        picker.move_cursor(1);
        assert_eq!(picker.selected_folder(), None);
        picker.move_cursor(-1);
        assert_eq!(picker.selected_folder(), Some("Ops"));
        assert_eq!(
            picker.labels().collect::<Vec<_>>(),
            ["Unassigned", "Ops"]
        );
    }
}
