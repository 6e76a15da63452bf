use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

/// Optional table columns. The name/URL column is always rendered.
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
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ColumnKey {
    Status,
    Type,
    Folder,
    ResponseTime,
    LastChecked,
    CheckFrequency,
    Region,
    Ssl,
    DomainExpiry,
    CreatedAt,
}

impl ColumnKey {
    pub fn title(&self) -> &'static str {
        match self {
            ColumnKey::Status => "Status",
            ColumnKey::Type => "Type",
            ColumnKey::Folder => "Folder",
            ColumnKey::ResponseTime => "Resp.",
            ColumnKey::LastChecked => "Last check",
            ColumnKey::CheckFrequency => "Every",
            ColumnKey::Region => "Region",
            ColumnKey::Ssl => "SSL",
            ColumnKey::DomainExpiry => "Domain",
            ColumnKey::CreatedAt => "Created",
        }
    }
}

/// Per-column visibility, persisted on its own and never tied to sort or grouping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ColumnVisibility(IndexMap<ColumnKey, bool>);

impl Default for ColumnVisibility {
    fn default() -> Self {
        Self(ColumnKey::iter().map(|key| (key, true)).collect())
    }
}

impl ColumnVisibility {
    pub fn is_visible(&self, key: ColumnKey) -> bool {
        self.0.get(&key).copied().unwrap_or(true)
    }

    /// Flips one column; returns its new visibility.
    pub fn toggle(&mut self, key: ColumnKey) -> bool {
        let entry = self.0.entry(key).or_insert(true);
        *entry = !*entry;
        *entry
    }

    pub fn set(&mut self, key: ColumnKey, visible: bool) {
        self.0.insert(key, visible);
    }

    pub fn visible_columns(&self) -> Vec<ColumnKey> {
        ColumnKey::iter()
            .filter(|key| self.is_visible(*key))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ColumnKey, bool)> + '_ {
        ColumnKey::iter().map(|key| (key, self.is_visible(key)))
    }

    /// Builds visibility from a stored JSON object. Unknown keys are ignored, missing keys
    /// stay visible and values are coerced to booleans.
    pub fn from_json(value: &Value) -> Self {
        let mut columns = Self::default();
        let Some(map) = value.as_object() else {
            return columns;
        };
        for (raw_key, raw_value) in map {
            let Ok(key) = raw_key.parse::<ColumnKey>() else {
                tracing::debug!(column = %raw_key, "ignoring unknown column key");
                continue;
            };
            columns.set(key, coerce_bool(raw_value));
        }
        columns
    }
}

impl<'de> Deserialize<'de> for ColumnVisibility {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_json(&value))
    }
}

fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map(|n| n != 0.0).unwrap_or(true),
        Value::String(text) => !matches!(
            text.trim().to_ascii_lowercase().as_str(),
            "false" | "0" | "no" | "off" | ""
        ),
        Value::Null => false,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_column_defaults_to_visible() {
        let columns = ColumnVisibility::default();
        assert_eq!(columns.visible_columns().len(), ColumnKey::iter().count());
    }

    #[test]
    fn toggling_one_column_leaves_the_rest() {
        let mut columns = ColumnVisibility::default();
        assert!(!columns.toggle(ColumnKey::Region));
        assert!(!columns.is_visible(ColumnKey::Region));
        assert!(columns.is_visible(ColumnKey::Status));
        assert!(columns.toggle(ColumnKey::Region));
    }

    #[test]
    fn stored_values_are_coerced() {
        let columns = ColumnVisibility::from_json(&json!({
            "status": false,
            "ssl": 0,
            "region": "false",
            "folder": "yes",
            "bogus": false,
        }));
        assert!(!columns.is_visible(ColumnKey::Status));
        assert!(!columns.is_visible(ColumnKey::Ssl));
        assert!(!columns.is_visible(ColumnKey::Region));
        assert!(columns.is_visible(ColumnKey::Folder));
        assert!(columns.is_visible(ColumnKey::CreatedAt));
    }

    #[test]
    fn serializes_as_camel_case_object() {
        let mut columns = ColumnVisibility::default();
        columns.toggle(ColumnKey::ResponseTime);
        let json = serde_json::to_value(&columns).expect("json");
        assert_eq!(json["responseTime"], false);
        assert_eq!(json["lastChecked"], true);
    }
}
