use std::fmt;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull};
use strum::{AsRefStr, Display, EnumIter, EnumString};

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckId(String);

impl CheckId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for CheckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CheckId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CheckId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Last observed reachability of a check.
///
/// Older documents used `UP` / `DOWN`; those and any upper-case spelling map onto the
/// canonical variants. Anything unrecognised (or missing) is `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum CheckStatus {
    Online,
    Offline,
    Redirect,
    ReachableWithError,
    #[default]
    Unknown,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Online => "online",
            CheckStatus::Offline => "offline",
            CheckStatus::Redirect => "redirect",
            CheckStatus::ReachableWithError => "reachable_with_error",
            CheckStatus::Unknown => "unknown",
        }
    }

    /// Precedence used by the status sort; lower ranks first.
    pub fn rank(&self) -> u8 {
        match self {
            CheckStatus::Online => 0,
            CheckStatus::Offline => 1,
            CheckStatus::Redirect => 2,
            CheckStatus::ReachableWithError => 3,
            CheckStatus::Unknown => 4,
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "online" | "up" => CheckStatus::Online,
            "offline" | "down" => CheckStatus::Offline,
            "redirect" => CheckStatus::Redirect,
            "reachable_with_error" => CheckStatus::ReachableWithError,
            _ => CheckStatus::Unknown,
        }
    }
}

impl From<String> for CheckStatus {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum CheckType {
    #[default]
    Website,
    RestEndpoint,
    Tcp,
    Udp,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum CheckRegion {
    UsCentral1,
    EuropeWest1,
    AsiaSoutheast1,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SslCertificate {
    pub valid: bool,
    pub days_until_expiry: Option<i64>,
    pub issuer: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DomainExpiry {
    pub valid: bool,
    pub days_until_expiry: Option<i64>,
    pub registrar: Option<String>,
    pub error: Option<String>,
}

/// One monitored endpoint as pushed in by the record source.
///
/// Timestamps are epoch milliseconds; `check_frequency` is stored in seconds. Exports write
/// missing values as `null`, which reads the same as an absent key.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRecord {
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub id: CheckId,
    pub name: String,
    pub url: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub status: CheckStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_frequency: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_check_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time: Option<u64>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub disabled: bool,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "type", default)]
    pub check_type: CheckType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_region: Option<CheckRegion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_certificate: Option<SslCertificate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_expiry: Option<DomainExpiry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_status_codes: Option<Vec<u16>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down_confirmation_attempts: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl CheckRecord {
    pub fn new<I: Into<CheckId>>(id: I, name: &str, url: &str) -> Self {
        Self {
            id: id.into(),
            name: name.to_string(),
            url: url.to_string(),
            ..Self::default()
        }
    }

    /// Trimmed folder label, `None` when unassigned or blank.
    pub fn folder_label(&self) -> Option<&str> {
        self.folder
            .as_deref()
            .map(str::trim)
            .filter(|folder| !folder.is_empty())
    }
}
