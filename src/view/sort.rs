use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use crate::model::CheckRecord;

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
pub enum SortKey {
    #[default]
    #[serde(rename = "custom")]
    #[strum(serialize = "custom")]
    Custom,
    #[serde(rename = "name-asc")]
    #[strum(serialize = "name-asc")]
    NameAsc,
    #[serde(rename = "name-desc")]
    #[strum(serialize = "name-desc")]
    NameDesc,
    #[serde(rename = "url-asc")]
    #[strum(serialize = "url-asc")]
    UrlAsc,
    #[serde(rename = "url-desc")]
    #[strum(serialize = "url-desc")]
    UrlDesc,
    #[serde(rename = "status")]
    #[strum(serialize = "status")]
    Status,
    #[serde(rename = "lastChecked")]
    #[strum(serialize = "lastChecked")]
    LastChecked,
    #[serde(rename = "createdAt")]
    #[strum(serialize = "createdAt")]
    CreatedAt,
    #[serde(rename = "responseTime")]
    #[strum(serialize = "responseTime")]
    ResponseTime,
    #[serde(rename = "type")]
    #[strum(serialize = "type")]
    Type,
    #[serde(rename = "checkFrequency")]
    #[strum(serialize = "checkFrequency")]
    CheckFrequency,
}

impl SortKey {
    pub fn label(&self) -> &'static str {
        match self {
            SortKey::Custom => "Custom order",
            SortKey::NameAsc => "Name (A-Z)",
            SortKey::NameDesc => "Name (Z-A)",
            SortKey::UrlAsc => "URL (A-Z)",
            SortKey::UrlDesc => "URL (Z-A)",
            SortKey::Status => "Status",
            SortKey::LastChecked => "Last checked",
            SortKey::CreatedAt => "Created",
            SortKey::ResponseTime => "Response time",
            SortKey::Type => "Type",
            SortKey::CheckFrequency => "Check interval",
        }
    }

    /// Next key in declaration order, wrapping around; drives the sort cycling key.
    pub fn next(self) -> SortKey {
        let all: Vec<SortKey> = SortKey::iter().collect();
        let idx = all.iter().position(|key| *key == self).unwrap_or(0);
        all[(idx + 1) % all.len()]
    }
}

/// Orders `records` by `key` without touching the source slice.
///
/// The sort is stable, so ties keep their incoming order and re-sorting an already
/// sorted sequence is a no-op.
pub fn sort_checks<'a, I>(records: I, key: SortKey) -> Vec<&'a CheckRecord>
where
    I: IntoIterator<Item = &'a CheckRecord>,
{
    let mut ordered: Vec<&CheckRecord> = records.into_iter().collect();
    ordered.sort_by(|a, b| compare(a, b, key));
    ordered
}

/// Same as [`sort_checks`] for a key that came from outside (CLI, stored preference).
/// A key that does not parse leaves the input order untouched.
pub fn sort_checks_raw<'a, I>(records: I, raw_key: &str) -> Vec<&'a CheckRecord>
where
    I: IntoIterator<Item = &'a CheckRecord>,
{
    match raw_key.parse::<SortKey>() {
        Ok(key) => sort_checks(records, key),
        Err(_) => {
            tracing::debug!(raw_key, "unrecognised sort key, keeping input order");
            records.into_iter().collect()
        }
    }
}

fn compare(a: &CheckRecord, b: &CheckRecord, key: SortKey) -> Ordering {
    match key {
        SortKey::Custom => a.order_index.unwrap_or(0).cmp(&b.order_index.unwrap_or(0)),
        SortKey::NameAsc => locale_cmp(&a.name, &b.name),
        SortKey::NameDesc => locale_cmp(&b.name, &a.name),
        SortKey::UrlAsc => locale_cmp(&a.url, &b.url),
        SortKey::UrlDesc => locale_cmp(&b.url, &a.url),
        SortKey::Status => a.status.rank().cmp(&b.status.rank()),
        SortKey::LastChecked => b
            .last_checked
            .unwrap_or(0)
            .cmp(&a.last_checked.unwrap_or(0)),
        // missing response times count as 0 and therefore lead the list
        SortKey::ResponseTime => a
            .response_time
            .unwrap_or(0)
            .cmp(&b.response_time.unwrap_or(0)),
        SortKey::Type => a.check_type.as_ref().cmp(b.check_type.as_ref()),
        SortKey::CreatedAt => a.created_at.unwrap_or(0).cmp(&b.created_at.unwrap_or(0)),
        SortKey::CheckFrequency => a
            .check_frequency
            .unwrap_or(0)
            .cmp(&b.check_frequency.unwrap_or(0)),
    }
}

/// Case-insensitive comparison that falls back to the raw strings on ties, so "alpha"
/// sorts next to "Alpha" but the order between them is still total.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CheckStatus, CheckType};

    fn check(id: &str) -> CheckRecord {
        CheckRecord::new(id, id, &format!("https://{id}.test"))
    }

    fn ids(records: &[&CheckRecord]) -> Vec<String> {
        records.iter().map(|record| record.id.to_string()).collect()
    }

    fn sample() -> Vec<CheckRecord> {
        let mut a = check("a");
        a.name = "beta".into();
        a.order_index = Some(5);
        a.status = CheckStatus::Offline;
        a.last_checked = Some(30);
        a.response_time = Some(120);
        a.check_type = CheckType::Tcp;
        let mut b = check("b");
        b.name = "Alpha".into();
        b.status = CheckStatus::Unknown;
        b.created_at = Some(10);
        let mut c = check("c");
        c.name = "gamma".into();
        c.order_index = Some(2);
        c.status = CheckStatus::Online;
        c.last_checked = Some(50);
        c.response_time = Some(40);
        c.check_frequency = Some(60);
        vec![a, b, c]
    }

    #[test]
    fn custom_order_treats_missing_index_as_zero() {
        let records = sample();
        assert_eq!(ids(&sort_checks(&records, SortKey::Custom)), ["b", "c", "a"]);
    }

    #[test]
    fn status_sort_follows_precedence_table() {
        let statuses = [
            CheckStatus::Unknown,
            CheckStatus::Offline,
            CheckStatus::Online,
            CheckStatus::Redirect,
        ];
        let records: Vec<CheckRecord> = statuses
            .iter()
            .enumerate()
            .map(|(idx, status)| {
                let mut record = check(&idx.to_string());
                record.status = *status;
                record
            })
            .collect();
        let ordered: Vec<CheckStatus> = sort_checks(&records, SortKey::Status)
            .into_iter()
            .map(|record| record.status)
            .collect();
        assert_eq!(
            ordered,
            [
                CheckStatus::Online,
                CheckStatus::Offline,
                CheckStatus::Redirect,
                CheckStatus::Unknown
            ]
        );
    }

    #[test]
    fn name_sort_ignores_case() {
        let records = sample();
        assert_eq!(ids(&sort_checks(&records, SortKey::NameAsc)), ["b", "a", "c"]);
        assert_eq!(ids(&sort_checks(&records, SortKey::NameDesc)), ["c", "a", "b"]);
    }

    #[test]
    fn last_checked_descends_and_missing_sorts_last() {
        let records = sample();
        assert_eq!(
            ids(&sort_checks(&records, SortKey::LastChecked)),
            ["c", "a", "b"]
        );
    }

    #[test]
    fn missing_response_time_sorts_first() {
        let records = sample();
        assert_eq!(
            ids(&sort_checks(&records, SortKey::ResponseTime)),
            ["b", "c", "a"]
        );
    }

    #[test]
    fn type_sort_defaults_to_website() {
        let records = sample();
        // "tcp" < "website"; b and c are websites and keep their relative order
        assert_eq!(ids(&sort_checks(&records, SortKey::Type)), ["a", "b", "c"]);
    }

    #[test]
    fn every_key_yields_an_idempotent_permutation() {
        let records = sample();
        for key in SortKey::iter() {
            let once = sort_checks(&records, key);
            let mut sorted_ids = ids(&once);
            sorted_ids.sort();
            assert_eq!(sorted_ids, ["a", "b", "c"], "{key} dropped records");
            let twice = sort_checks(once.iter().copied(), key);
            assert_eq!(ids(&once), ids(&twice), "{key} is not idempotent");
        }
    }

    #[test]
    fn unrecognised_key_keeps_input_order() {
        let records = sample();
        assert_eq!(ids(&sort_checks_raw(&records, "bogus")), ["a", "b", "c"]);
        assert_eq!(
            ids(&sort_checks_raw(&records, "custom")),
            ["b", "c", "a"]
        );
    }

    #[test]
    fn sort_keys_round_trip_through_strings() {
        for key in SortKey::iter() {
            let text = key.to_string();
            assert_eq!(text.parse::<SortKey>().ok(), Some(key));
            let json = serde_json::to_string(&key).expect("json");
            assert_eq!(json, format!("\"{text}\""));
        }
    }
}
