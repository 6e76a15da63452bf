use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::model::CheckRecord;
use crate::view::sort::locale_cmp;

pub const UNSORTED_GROUP_KEY: &str = "__unsorted__";
pub const UNSORTED_GROUP_LABEL: &str = "Unsorted";

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum GroupBy {
    #[default]
    None,
    Folder,
}

impl GroupBy {
    pub fn toggled(self) -> GroupBy {
        match self {
            GroupBy::None => GroupBy::Folder,
            GroupBy::Folder => GroupBy::None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckGroup<'a> {
    pub key: String,
    pub label: String,
    pub members: Vec<&'a CheckRecord>,
}

impl CheckGroup<'_> {
    pub fn is_unsorted(&self) -> bool {
        self.key == UNSORTED_GROUP_KEY
    }
}

/// Partitions an already ordered sequence by folder.
///
/// Members keep the order they arrive in; only the groups themselves are sorted, with the
/// unsorted bucket always leading.
pub fn group_checks<'a>(ordered: &[&'a CheckRecord]) -> Vec<CheckGroup<'a>> {
    let mut buckets: IndexMap<String, CheckGroup<'a>> = IndexMap::new();
    for record in ordered {
        let (key, label) = match record.folder_label() {
            Some(folder) => (folder.to_string(), folder.to_string()),
            None => (
                UNSORTED_GROUP_KEY.to_string(),
                UNSORTED_GROUP_LABEL.to_string(),
            ),
        };
        buckets
            .entry(key.clone())
            .or_insert_with(|| CheckGroup {
                key,
                label,
                members: Vec::new(),
            })
            .members
            .push(record);
    }

    let mut groups: Vec<CheckGroup<'a>> = buckets.into_values().collect();
    groups.sort_by(|a, b| match (a.is_unsorted(), b.is_unsorted()) {
        (true, false) => std::cmp::Ordering::Less,
        (false, true) => std::cmp::Ordering::Greater,
        _ => locale_cmp(&a.label, &b.label),
    });
    groups
}

/// Group keys the user has collapsed. Kept as plain strings so a folder that disappears
/// and comes back stays collapsed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollapsedFolders(BTreeSet<String>);

impl CollapsedFolders {
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    /// Flips membership of `key`; returns whether it is collapsed afterwards.
    pub fn toggle(&mut self, key: &str) -> bool {
        if self.0.remove(key) {
            false
        } else {
            self.0.insert(key.to_string());
            true
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<String> for CollapsedFolders {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_folder(id: &str, folder: &str) -> CheckRecord {
        let mut record = CheckRecord::new(id, id, "https://example.test");
        record.folder = Some(folder.to_string());
        record
    }

    #[test]
    fn unsorted_group_comes_first_then_labels() {
        let records = vec![
            in_folder("z", "Zeta"),
            in_folder("u", ""),
            in_folder("a", "Alpha"),
        ];
        let ordered: Vec<&CheckRecord> = records.iter().collect();
        let keys: Vec<String> = group_checks(&ordered)
            .into_iter()
            .map(|group| group.key)
            .collect();
        assert_eq!(keys, ["__unsorted__", "Alpha", "Zeta"]);
    }

    #[test]
    fn members_keep_incoming_order_and_folders_are_trimmed() {
        let records = vec![
            in_folder("2", " Ops "),
            in_folder("1", "Ops"),
            in_folder("3", "   "),
        ];
        let ordered: Vec<&CheckRecord> = records.iter().collect();
        let groups = group_checks(&ordered);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].label, UNSORTED_GROUP_LABEL);
        let ops: Vec<&str> = groups[1]
            .members
            .iter()
            .map(|record| record.id.as_str())
            .collect();
        assert_eq!(ops, ["2", "1"]);
    }

    #[test]
    fn collapse_toggle_flips_membership() {
        let mut collapsed = CollapsedFolders::default();
        assert!(collapsed.toggle("Ops"));
        assert!(collapsed.contains("Ops"));
        assert!(!collapsed.toggle("Ops"));
        assert!(collapsed.is_empty());
    }
}
