use std::cmp::{max, min};

use time::format_description;
use time::{Date, Duration, Time};

use crate::model::{CheckRecord, CheckRegion, CheckStatus, CheckType};

/// Epoch-millisecond window, `to` exclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeFilter {
    pub from: Option<i64>,
    pub to: Option<i64>,
}

impl RangeFilter {
    pub fn has_range(&self) -> bool {
        self.from.is_some() || self.to.is_some()
    }

    pub fn merge(&mut self, other: RangeFilter) {
        if let Some(from) = other.from {
            self.from = Some(match self.from {
                Some(existing) => max(existing, from),
                None => from,
            });
        }
        if let Some(to) = other.to {
            self.to = Some(match self.to {
                Some(existing) => min(existing, to),
                None => to,
            });
        }
    }

    /// A missing timestamp only passes an empty range.
    pub fn contains(&self, value: Option<i64>) -> bool {
        if !self.has_range() {
            return true;
        }
        let Some(value) = value else {
            return false;
        };
        self.from.map_or(true, |from| value >= from) && self.to.map_or(true, |to| value < to)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckQuery {
    pub terms: Vec<String>,
    pub folders: Vec<String>,
    pub statuses: Vec<CheckStatus>,
    pub types: Vec<CheckType>,
    pub regions: Vec<CheckRegion>,
    pub disabled: Option<bool>,
    pub checked: RangeFilter,
    pub created: RangeFilter,
}

impl CheckQuery {
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && !self.has_filters()
    }

    pub fn has_filters(&self) -> bool {
        !self.folders.is_empty()
            || !self.statuses.is_empty()
            || !self.types.is_empty()
            || !self.regions.is_empty()
            || self.disabled.is_some()
            || self.checked.has_range()
            || self.created.has_range()
    }

    /// Every condition must hold. Values within one prefix are alternatives.
    pub fn matches(&self, record: &CheckRecord) -> bool {
        if !self.terms.is_empty() {
            let name = record.name.to_lowercase();
            let url = record.url.to_lowercase();
            if !self
                .terms
                .iter()
                .all(|term| name.contains(term.as_str()) || url.contains(term.as_str()))
            {
                return false;
            }
        }
        if !self.folders.is_empty() {
            let folder = record.folder_label().map(str::to_lowercase);
            if !self
                .folders
                .iter()
                .any(|wanted| folder.as_deref() == Some(wanted.as_str()))
            {
                return false;
            }
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&record.status) {
            return false;
        }
        if !self.types.is_empty() && !self.types.contains(&record.check_type) {
            return false;
        }
        if !self.regions.is_empty()
            && !record
                .check_region
                .is_some_and(|region| self.regions.contains(&region))
        {
            return false;
        }
        if let Some(disabled) = self.disabled {
            if record.disabled != disabled {
                return false;
            }
        }
        self.checked.contains(record.last_checked) && self.created.contains(record.created_at)
    }
}

pub fn parse_query(input: &str) -> CheckQuery {
    let mut query = CheckQuery::default();
    for raw in input.split_whitespace() {
        if let Some(folder) = raw.strip_prefix("folder:") {
            if let Some(value) = sanitize_term(folder) {
                query.folders.push(value.to_lowercase());
            }
            continue;
        }
        if let Some(status) = raw.strip_prefix("status:") {
            let parsed = CheckStatus::parse(status);
            if parsed != CheckStatus::Unknown || status.eq_ignore_ascii_case("unknown") {
                query.statuses.push(parsed);
            } else {
                tracing::debug!(status, "ignoring unknown status filter");
            }
            continue;
        }
        if let Some(kind) = raw.strip_prefix("type:") {
            match kind.parse::<CheckType>() {
                Ok(parsed) => query.types.push(parsed),
                Err(_) => tracing::debug!(kind, "ignoring unknown type filter"),
            }
            continue;
        }
        if let Some(region) = raw.strip_prefix("region:") {
            match region.parse::<CheckRegion>() {
                Ok(parsed) => query.regions.push(parsed),
                Err(_) => tracing::debug!(region, "ignoring unknown region filter"),
            }
            continue;
        }
        if let Some(flag) = raw.strip_prefix("is:") {
            match flag.to_ascii_lowercase().as_str() {
                "disabled" | "paused" => query.disabled = Some(true),
                "enabled" | "active" => query.disabled = Some(false),
                _ => tracing::debug!(flag, "ignoring unknown is: filter"),
            }
            continue;
        }
        if let Some(range) = raw.strip_prefix("checked:") {
            query.checked.merge(parse_date_range(range));
            continue;
        }
        if let Some(range) = raw.strip_prefix("created:") {
            query.created.merge(parse_date_range(range));
            continue;
        }
        if let Some(value) = sanitize_term(raw) {
            query.terms.push(value.to_lowercase());
        }
    }
    query
}

/// Applies `query` to `records`, keeping their order. `limit` caps the result size.
pub fn filter_checks<'a>(
    records: &'a [CheckRecord],
    query: &CheckQuery,
    limit: Option<usize>,
) -> Vec<&'a CheckRecord> {
    let matched = records.iter().filter(|record| query.matches(record));
    match limit {
        Some(limit) => matched.take(limit).collect(),
        None => matched.collect(),
    }
}

fn sanitize_term(raw: &str) -> Option<String> {
    let term: String = raw
        .chars()
        .filter(|ch| ch.is_alphanumeric() || matches!(ch, '-' | '_' | '.' | '/' | ':'))
        .collect();
    if term.is_empty() {
        None
    } else {
        Some(term)
    }
}

/// `DATE`, `A..B` (either end open), `>DATE` (after that day) or `<DATE` (before it).
fn parse_date_range(raw: &str) -> RangeFilter {
    let mut range = RangeFilter::default();
    if let Some(after) = raw.strip_prefix('>') {
        range.from = parse_single_date(after).map(|(_, end)| end);
        return range;
    }
    if let Some(before) = raw.strip_prefix('<') {
        range.to = parse_single_date(before).map(|(start, _)| start);
        return range;
    }
    let parts: Vec<&str> = raw.split("..").collect();
    match parts.as_slice() {
        [single] => {
            if let Some((from, to)) = parse_single_date(single) {
                range.from = Some(from);
                range.to = Some(to);
            }
        }
        [from, to] => {
            if !from.is_empty() {
                if let Some((start, _)) = parse_single_date(from) {
                    range.from = Some(start);
                }
            }
            if !to.is_empty() {
                if let Some((_, end)) = parse_single_date(to) {
                    range.to = Some(end);
                }
            }
        }
        _ => {}
    }
    range
}

fn parse_single_date(input: &str) -> Option<(i64, i64)> {
    static FORMAT: once_cell::sync::Lazy<Vec<format_description::FormatItem<'static>>> =
        once_cell::sync::Lazy::new(|| {
            format_description::parse("[year]-[month]-[day]")
                .expect("valid date format description")
        });
    let date = Date::parse(input, &*FORMAT).ok()?;
    let from = date.with_time(Time::MIDNIGHT).assume_utc().unix_timestamp() * 1000;
    let to = date
        .checked_add(Duration::days(1))?
        .with_time(Time::MIDNIGHT)
        .assume_utc()
        .unix_timestamp()
        * 1000;
    Some((from, to))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, name: &str, url: &str) -> CheckRecord {
        CheckRecord::new(id, name, url)
    }

    #[test]
    fn prefixes_are_split_from_terms() {
        let query = parse_query("api folder:Ops status:DOWN type:tcp region:europe-west1 is:disabled");
        assert_eq!(query.terms, ["api"]);
        assert_eq!(query.folders, ["ops"]);
        assert_eq!(query.statuses, [CheckStatus::Offline]);
        assert_eq!(query.types, [CheckType::Tcp]);
        assert_eq!(query.regions, [CheckRegion::EuropeWest1]);
        assert_eq!(query.disabled, Some(true));
    }

    #[test]
    fn unknown_prefix_values_are_dropped() {
        let query = parse_query("status:sideways type:smtp region:mars");
        assert!(query.is_empty());
    }

    #[test]
    fn terms_match_name_or_url_case_insensitively() {
        let query = parse_query("SHOP");
        assert!(query.matches(&record("a", "Shop front", "https://a.test")));
        assert!(query.matches(&record("b", "B", "https://shop.example")));
        assert!(!query.matches(&record("c", "Blog", "https://blog.test")));
    }

    #[test]
    fn folder_filter_compares_trimmed_labels() {
        let query = parse_query("folder:ops");
        let mut inside = record("a", "a", "https://a.test");
        inside.folder = Some(" Ops ".into());
        let outside = record("b", "b", "https://b.test");
        assert!(query.matches(&inside));
        assert!(!query.matches(&outside));
    }

    #[test]
    fn checked_range_uses_milliseconds() {
        let query = parse_query("checked:2024-03-01");
        let mut hit = record("a", "a", "https://a.test");
        hit.last_checked = Some(1_709_294_400_000); // 2024-03-01T12:00:00Z
        let mut miss = record("b", "b", "https://b.test");
        miss.last_checked = Some(1_709_380_800_000); // 2024-03-02T12:00:00Z
        let never = record("c", "c", "https://c.test");
        assert!(query.matches(&hit));
        assert!(!query.matches(&miss));
        assert!(!query.matches(&never));
    }

    #[test]
    fn after_and_before_forms_exclude_the_named_day() {
        let day_start = 1_709_251_200_000; // 2024-03-01T00:00:00Z
        let next_day = day_start + 86_400_000;

        let after = parse_query("checked:>2024-03-01");
        assert_eq!(after.checked, RangeFilter { from: Some(next_day), to: None });
        let mut early = record("a", "a", "https://a.test");
        early.last_checked = Some(1000);
        let mut late = record("b", "b", "https://b.test");
        late.last_checked = Some(next_day);
        assert!(!after.matches(&early));
        assert!(after.matches(&late));

        let before = parse_query("created:<2024-03-01");
        assert_eq!(before.created, RangeFilter { from: None, to: Some(day_start) });
        early.created_at = Some(day_start - 1);
        late.created_at = Some(day_start);
        assert!(before.matches(&early));
        assert!(!before.matches(&late));
    }

    #[test]
    fn open_ended_ranges_and_bad_dates() {
        let query = parse_query("checked:2024-03-01.. created:..2024-03-01 checked:>soon");
        assert_eq!(query.checked.from, Some(1_709_251_200_000));
        assert_eq!(query.checked.to, None);
        assert_eq!(query.created.to, Some(1_709_337_600_000));
    }

    #[test]
    fn filter_keeps_order_and_honours_limit() {
        let records = vec![
            record("a", "api one", "https://a.test"),
            record("b", "web", "https://b.test"),
            record("c", "api two", "https://c.test"),
        ];
        let query = parse_query("api");
        let ids: Vec<&str> = filter_checks(&records, &query, None)
            .iter()
            .map(|record| record.id.as_str())
            .collect();
        assert_eq!(ids, ["a", "c"]);
        assert_eq!(filter_checks(&records, &query, Some(1)).len(), 1);
    }
}
