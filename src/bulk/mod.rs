use bitflags::bitflags;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

use crate::model::{CheckRecord, CheckRegion};

pub const MIN_STATUS_CODE: u16 = 100;
pub const MAX_STATUS_CODE: u16 = 599;
pub const MIN_DOWN_CONFIRMATION_ATTEMPTS: u32 = 1;
pub const MAX_DOWN_CONFIRMATION_ATTEMPTS: u32 = 99;
pub const REGION_AUTO: &str = "auto";
pub const TIMEZONE_DEFAULT: &str = "default";

bitflags! {
    /// Fields whose "include" toggle is switched on in the bulk editor.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BulkFields: u8 {
        const CHECK_FREQUENCY = 1 << 0;
        const EXPECTED_STATUS_CODES = 1 << 1;
        const DOWN_CONFIRMATION_ATTEMPTS = 1 << 2;
        const CHECK_REGION = 1 << 3;
        const TIMEZONE = 1 << 4;
    }
}

impl BulkFields {
    pub const ORDERED: [BulkFields; 5] = [
        BulkFields::CHECK_FREQUENCY,
        BulkFields::EXPECTED_STATUS_CODES,
        BulkFields::DOWN_CONFIRMATION_ATTEMPTS,
        BulkFields::CHECK_REGION,
        BulkFields::TIMEZONE,
    ];

    pub fn label(self) -> &'static str {
        if self == BulkFields::CHECK_FREQUENCY {
            "Check interval"
        } else if self == BulkFields::EXPECTED_STATUS_CODES {
            "Expected status codes"
        } else if self == BulkFields::DOWN_CONFIRMATION_ATTEMPTS {
            "Down confirmation attempts"
        } else if self == BulkFields::CHECK_REGION {
            "Region"
        } else if self == BulkFields::TIMEZONE {
            "Timezone"
        } else {
            "Multiple fields"
        }
    }
}

/// Unit the interval input is typed in. Storage is always seconds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum IntervalUnit {
    #[default]
    Minutes,
    Seconds,
}

impl IntervalUnit {
    /// `None` when the value does not fit in seconds.
    pub fn to_seconds(self, value: u32) -> Option<u32> {
        match self {
            IntervalUnit::Minutes => value.checked_mul(60),
            IntervalUnit::Seconds => Some(value),
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            IntervalUnit::Minutes => "min",
            IntervalUnit::Seconds => "s",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputRejected {
    #[error("check interval must be greater than zero")]
    ZeroInterval,
    #[error("check interval of {value} {unit} is too large")]
    IntervalTooLarge { value: u32, unit: IntervalUnit },
    #[error("down confirmation attempts must be between {min} and {max}, got {value}")]
    AttemptsOutOfRange { value: i64, min: u32, max: u32 },
    #[error("'{0}' is not a number")]
    NotANumber(String),
    #[error("unknown region '{0}'")]
    UnknownRegion(String),
    #[error("timezone cannot be empty")]
    EmptyTimezone,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RegionChoice {
    #[default]
    Auto,
    Region(CheckRegion),
}

impl RegionChoice {
    pub fn parse(raw: &str) -> Result<Self, InputRejected> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case(REGION_AUTO) {
            return Ok(RegionChoice::Auto);
        }
        trimmed
            .parse::<CheckRegion>()
            .map(RegionChoice::Region)
            .map_err(|_| InputRejected::UnknownRegion(trimmed.to_string()))
    }

    /// Cycles auto → each region → auto.
    pub fn next(&self) -> RegionChoice {
        use strum::IntoEnumIterator;
        let regions: Vec<CheckRegion> = CheckRegion::iter().collect();
        match self {
            RegionChoice::Auto => regions
                .first()
                .copied()
                .map(RegionChoice::Region)
                .unwrap_or(RegionChoice::Auto),
            RegionChoice::Region(current) => {
                let idx = regions.iter().position(|region| region == current);
                match idx.and_then(|idx| regions.get(idx + 1)) {
                    Some(next) => RegionChoice::Region(*next),
                    None => RegionChoice::Auto,
                }
            }
        }
    }

    fn to_override(&self) -> Option<CheckRegion> {
        match self {
            RegionChoice::Auto => None,
            RegionChoice::Region(region) => Some(*region),
        }
    }

    pub fn display(&self) -> String {
        match self {
            RegionChoice::Auto => REGION_AUTO.to_string(),
            RegionChoice::Region(region) => region.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TimezoneChoice {
    #[default]
    Default,
    Zone(String),
}

impl TimezoneChoice {
    pub fn parse(raw: &str) -> Result<Self, InputRejected> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InputRejected::EmptyTimezone);
        }
        if trimmed.eq_ignore_ascii_case(TIMEZONE_DEFAULT) {
            return Ok(TimezoneChoice::Default);
        }
        Ok(TimezoneChoice::Zone(trimmed.to_string()))
    }

    pub fn display(&self) -> String {
        match self {
            TimezoneChoice::Default => TIMEZONE_DEFAULT.to_string(),
            TimezoneChoice::Zone(zone) => zone.clone(),
        }
    }
}

/// Partial settings update sent to `bulk_update_settings`.
///
/// Outer `None` means "leave untouched" and is not serialized at all; `Some(None)` on the
/// nullable fields is an explicit reset and serializes as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_frequency: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_status_codes: Option<Vec<u16>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down_confirmation_attempts: Option<u8>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub check_region: Option<Option<CheckRegion>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub timezone: Option<Option<String>>,
}

impl CheckPatch {
    pub fn is_empty(&self) -> bool {
        self.check_frequency.is_none()
            && self.expected_status_codes.is_none()
            && self.down_confirmation_attempts.is_none()
            && self.check_region.is_none()
            && self.timezone.is_none()
    }

    pub fn apply_to(&self, record: &mut CheckRecord) {
        if let Some(seconds) = self.check_frequency {
            record.check_frequency = Some(seconds);
        }
        if let Some(codes) = &self.expected_status_codes {
            record.expected_status_codes = Some(codes.clone());
        }
        if let Some(attempts) = self.down_confirmation_attempts {
            record.down_confirmation_attempts = Some(attempts);
        }
        if let Some(region) = self.check_region {
            record.check_region = region;
        }
        if let Some(timezone) = &self.timezone {
            record.timezone = timezone.clone();
        }
    }
}

/// Transient state of one bulk-edit invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkEditDraft {
    enabled: BulkFields,
    interval_unit: IntervalUnit,
    interval: u32,
    status_codes: String,
    attempts: u8,
    region: RegionChoice,
    timezone: TimezoneChoice,
}

impl BulkEditDraft {
    pub fn new(interval_unit: IntervalUnit) -> Self {
        let interval = match interval_unit {
            IntervalUnit::Minutes => 5,
            IntervalUnit::Seconds => 300,
        };
        Self {
            enabled: BulkFields::empty(),
            interval_unit,
            interval,
            status_codes: String::from("200"),
            attempts: 3,
            region: RegionChoice::default(),
            timezone: TimezoneChoice::default(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.interval_unit);
    }

    pub fn enabled(&self) -> BulkFields {
        self.enabled
    }

    pub fn is_enabled(&self, field: BulkFields) -> bool {
        self.enabled.contains(field)
    }

    pub fn set_enabled(&mut self, field: BulkFields, enabled: bool) {
        self.enabled.set(field, enabled);
    }

    pub fn toggle(&mut self, field: BulkFields) {
        self.enabled.toggle(field);
    }

    pub fn interval_unit(&self) -> IntervalUnit {
        self.interval_unit
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    pub fn set_interval(&mut self, value: u32) -> Result<(), InputRejected> {
        if value == 0 {
            return Err(InputRejected::ZeroInterval);
        }
        if self.interval_unit.to_seconds(value).is_none() {
            return Err(InputRejected::IntervalTooLarge {
                value,
                unit: self.interval_unit,
            });
        }
        self.interval = value;
        Ok(())
    }

    pub fn set_interval_text(&mut self, raw: &str) -> Result<(), InputRejected> {
        let value = raw
            .trim()
            .parse::<u32>()
            .map_err(|_| InputRejected::NotANumber(raw.trim().to_string()))?;
        self.set_interval(value)
    }

    pub fn status_codes(&self) -> &str {
        &self.status_codes
    }

    /// Free text; parsing and range filtering happen when the diff is built.
    pub fn set_status_codes<S: Into<String>>(&mut self, raw: S) {
        self.status_codes = raw.into();
    }

    pub fn attempts(&self) -> u8 {
        self.attempts
    }

    /// Out-of-range values never reach the draft.
    pub fn set_attempts(&mut self, value: i64) -> Result<(), InputRejected> {
        let min = i64::from(MIN_DOWN_CONFIRMATION_ATTEMPTS);
        let max = i64::from(MAX_DOWN_CONFIRMATION_ATTEMPTS);
        if !(min..=max).contains(&value) {
            return Err(InputRejected::AttemptsOutOfRange {
                value,
                min: MIN_DOWN_CONFIRMATION_ATTEMPTS,
                max: MAX_DOWN_CONFIRMATION_ATTEMPTS,
            });
        }
        self.attempts = value as u8;
        Ok(())
    }

    pub fn set_attempts_text(&mut self, raw: &str) -> Result<(), InputRejected> {
        let value = raw
            .trim()
            .parse::<i64>()
            .map_err(|_| InputRejected::NotANumber(raw.trim().to_string()))?;
        self.set_attempts(value)
    }

    pub fn region(&self) -> &RegionChoice {
        &self.region
    }

    pub fn set_region(&mut self, region: RegionChoice) {
        self.region = region;
    }

    pub fn cycle_region(&mut self) {
        self.region = self.region.next();
    }

    pub fn timezone(&self) -> &TimezoneChoice {
        &self.timezone
    }

    pub fn set_timezone(&mut self, timezone: TimezoneChoice) {
        self.timezone = timezone;
    }

    /// Current value rendered for the editor, in the editor's own units.
    pub fn value_label(&self, field: BulkFields) -> String {
        if field == BulkFields::CHECK_FREQUENCY {
            format!("{} {}", self.interval, self.interval_unit.suffix())
        } else if field == BulkFields::EXPECTED_STATUS_CODES {
            self.status_codes.clone()
        } else if field == BulkFields::DOWN_CONFIRMATION_ATTEMPTS {
            self.attempts.to_string()
        } else if field == BulkFields::CHECK_REGION {
            self.region.display()
        } else if field == BulkFields::TIMEZONE {
            self.timezone.display()
        } else {
            String::new()
        }
    }

    pub fn build_diff(&self) -> CheckPatch {
        build_diff(self)
    }
}

/// Builds the minimal patch for the enabled fields of `draft`.
pub fn build_diff(draft: &BulkEditDraft) -> CheckPatch {
    let mut patch = CheckPatch::default();
    if draft.is_enabled(BulkFields::CHECK_FREQUENCY) {
        patch.check_frequency = draft.interval_unit.to_seconds(draft.interval);
    }
    if draft.is_enabled(BulkFields::EXPECTED_STATUS_CODES) {
        let codes = parse_status_codes(&draft.status_codes);
        if !codes.is_empty() {
            patch.expected_status_codes = Some(codes);
        }
    }
    if draft.is_enabled(BulkFields::DOWN_CONFIRMATION_ATTEMPTS) {
        patch.down_confirmation_attempts = Some(draft.attempts);
    }
    if draft.is_enabled(BulkFields::CHECK_REGION) {
        patch.check_region = Some(draft.region.to_override());
    }
    if draft.is_enabled(BulkFields::TIMEZONE) {
        patch.timezone = Some(match &draft.timezone {
            TimezoneChoice::Default => None,
            TimezoneChoice::Zone(zone) => Some(zone.clone()),
        });
    }
    patch
}

static CODE_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[,\s]+").expect("valid status code separator"));

/// Splits on commas/whitespace and keeps integers inside `[100, 599]`.
pub fn parse_status_codes(input: &str) -> Vec<u16> {
    CODE_SEPARATOR
        .split(input)
        .filter(|token| !token.is_empty())
        .filter_map(|token| token.parse::<u16>().ok())
        .filter(|code| (MIN_STATUS_CODE..=MAX_STATUS_CODE).contains(code))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn no_enabled_fields_yields_empty_patch() {
        let draft = BulkEditDraft::new(IntervalUnit::Minutes);
        assert!(draft.build_diff().is_empty());
        assert_eq!(serde_json::to_value(draft.build_diff()).expect("json"), json!({}));
    }

    #[test]
    fn status_codes_drop_garbage_and_out_of_range() {
        assert_eq!(parse_status_codes("200, abc, 700, 404"), vec![200, 404]);
        assert_eq!(parse_status_codes("  301 302\n99"), vec![301, 302]);
        assert!(parse_status_codes(" , ").is_empty());
    }

    #[test]
    fn enabled_codes_field_is_omitted_when_nothing_survives() {
        let mut draft = BulkEditDraft::new(IntervalUnit::Minutes);
        draft.set_enabled(BulkFields::EXPECTED_STATUS_CODES, true);
        draft.set_status_codes("abc 42");
        assert!(draft.build_diff().is_empty());
    }

    #[test]
    fn interval_is_converted_to_seconds() {
        let mut draft = BulkEditDraft::new(IntervalUnit::Minutes);
        draft.set_enabled(BulkFields::CHECK_FREQUENCY, true);
        draft.set_interval(2).expect("interval");
        assert_eq!(draft.build_diff().check_frequency, Some(120));

        let mut draft = BulkEditDraft::new(IntervalUnit::Seconds);
        draft.set_enabled(BulkFields::CHECK_FREQUENCY, true);
        draft.set_interval(45).expect("interval");
        assert_eq!(draft.build_diff().check_frequency, Some(45));
    }

    #[test]
    fn interval_overflowing_seconds_is_rejected() {
        let mut draft = BulkEditDraft::new(IntervalUnit::Minutes);
        draft.set_enabled(BulkFields::CHECK_FREQUENCY, true);
        assert_matches!(
            draft.set_interval(80_000_000),
            Err(InputRejected::IntervalTooLarge { value: 80_000_000, unit: IntervalUnit::Minutes })
        );
        assert_eq!(draft.interval(), 5);
        assert_eq!(draft.build_diff().check_frequency, Some(300));

        let mut draft = BulkEditDraft::new(IntervalUnit::Seconds);
        assert!(draft.set_interval(80_000_000).is_ok());
    }

    #[test]
    fn attempts_out_of_range_never_reach_the_draft() {
        let mut draft = BulkEditDraft::new(IntervalUnit::Minutes);
        assert_matches!(
            draft.set_attempts(0),
            Err(InputRejected::AttemptsOutOfRange { value: 0, .. })
        );
        assert_matches!(draft.set_attempts(100), Err(InputRejected::AttemptsOutOfRange { .. }));
        assert_eq!(draft.attempts(), 3);
        draft.set_attempts(99).expect("in range");
        assert_eq!(draft.attempts(), 99);
    }

    #[test]
    fn sentinels_map_to_explicit_nulls() {
        let mut draft = BulkEditDraft::new(IntervalUnit::Minutes);
        draft.set_enabled(BulkFields::CHECK_REGION, true);
        draft.set_enabled(BulkFields::TIMEZONE, true);
        draft.set_region(RegionChoice::parse("auto").expect("auto"));
        draft.set_timezone(TimezoneChoice::parse("default").expect("default"));
        let patch = draft.build_diff();
        assert_eq!(patch.check_region, Some(None));
        assert_eq!(patch.timezone, Some(None));
        assert_eq!(
            serde_json::to_value(&patch).expect("json"),
            json!({ "checkRegion": null, "timezone": null })
        );
    }

    #[test]
    fn concrete_region_and_zone_pass_through() {
        let mut draft = BulkEditDraft::new(IntervalUnit::Minutes);
        draft.set_enabled(BulkFields::CHECK_REGION | BulkFields::TIMEZONE, true);
        draft.set_region(RegionChoice::parse("europe-west1").expect("region"));
        draft.set_timezone(TimezoneChoice::parse("Europe/Oslo").expect("zone"));
        let patch = draft.build_diff();
        assert_eq!(patch.check_region, Some(Some(CheckRegion::EuropeWest1)));
        assert_eq!(patch.timezone, Some(Some("Europe/Oslo".to_string())));
        let back: CheckPatch =
            serde_json::from_value(serde_json::to_value(&patch).expect("json")).expect("patch");
        assert_eq!(back, patch);
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let mut record = CheckRecord::new("a", "a", "https://a.test");
        record.check_region = Some(CheckRegion::UsCentral1);
        record.timezone = Some("UTC".into());
        record.check_frequency = Some(60);
        let patch = CheckPatch {
            check_region: Some(None),
            down_confirmation_attempts: Some(5),
            ..CheckPatch::default()
        };
        patch.apply_to(&mut record);
        assert_eq!(record.check_region, None);
        assert_eq!(record.down_confirmation_attempts, Some(5));
        assert_eq!(record.timezone.as_deref(), Some("UTC"));
        assert_eq!(record.check_frequency, Some(60));
    }

    #[test]
    fn region_cycle_wraps_back_to_auto() {
        let mut choice = RegionChoice::Auto;
        let mut seen = 0;
        loop {
            choice = choice.next();
            seen += 1;
            if choice == RegionChoice::Auto {
                break;
            }
        }
        assert_eq!(seen, 4);
    }

    #[test]
    fn reset_restores_defaults_but_keeps_unit() {
        let mut draft = BulkEditDraft::new(IntervalUnit::Seconds);
        draft.toggle(BulkFields::TIMEZONE);
        draft.set_interval(10).expect("interval");
        draft.reset();
        assert_eq!(draft, BulkEditDraft::new(IntervalUnit::Seconds));
    }
}
