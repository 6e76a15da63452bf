//! Per-user view preferences behind an injected store.
//!
//! Each preference lives under its own key and is read and written independently, so a
//! column toggle never rewrites the sort choice and vice versa.

use std::collections::HashMap;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::storage::StorageHandle;
use crate::view::{CollapsedFolders, ColumnVisibility, GroupBy, SortKey, ViewPreferences};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, EnumIter,
)]
pub enum PreferenceKey {
    #[strum(serialize = "sortBy")]
    SortBy,
    #[strum(serialize = "groupBy")]
    GroupBy,
    #[strum(serialize = "columnVisibility")]
    ColumnVisibility,
    #[strum(serialize = "collapsedFolders")]
    CollapsedFolders,
}

pub trait PreferenceStore {
    fn read(&self, key: PreferenceKey) -> Result<Option<Value>>;
    fn write(&self, key: PreferenceKey, value: Value) -> Result<()>;
    /// Forgets every stored preference for this user.
    fn reset(&self) -> Result<()>;
}

/// Typed get/set over any [`PreferenceStore`].
pub trait TypedPreferences: PreferenceStore {
    /// Reads `key`, falling back to `default` when it is missing, unreadable or malformed.
    fn get_or<T: DeserializeOwned>(&self, key: PreferenceKey, default: T) -> T {
        match self.read(key) {
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(parsed) => parsed,
                Err(err) => {
                    tracing::warn!(%key, %err, "ignoring malformed preference");
                    default
                }
            },
            Ok(None) => default,
            Err(err) => {
                tracing::warn!(%key, ?err, "reading preference failed");
                default
            }
        }
    }

    fn set<T: Serialize>(&self, key: PreferenceKey, value: &T) -> Result<()> {
        let encoded = serde_json::to_value(value)
            .with_context(|| format!("encoding preference {key}"))?;
        self.write(key, encoded)
    }

    fn set_sort_by(&self, sort: SortKey) -> Result<()> {
        self.set(PreferenceKey::SortBy, &sort)
    }

    fn set_group_by(&self, group: GroupBy) -> Result<()> {
        self.set(PreferenceKey::GroupBy, &group)
    }

    fn set_columns(&self, columns: &ColumnVisibility) -> Result<()> {
        self.set(PreferenceKey::ColumnVisibility, columns)
    }

    fn set_collapsed(&self, collapsed: &CollapsedFolders) -> Result<()> {
        self.set(PreferenceKey::CollapsedFolders, collapsed)
    }

    /// Reads all view preferences once, e.g. when the dashboard opens. Missing keys take
    /// the values in `defaults`.
    fn load_view(&self, defaults: &ViewPreferences) -> ViewPreferences {
        ViewPreferences {
            sort_by: self.get_or(PreferenceKey::SortBy, defaults.sort_by),
            group_by: self.get_or(PreferenceKey::GroupBy, defaults.group_by),
            columns: self.get_or(PreferenceKey::ColumnVisibility, defaults.columns.clone()),
            collapsed: self.get_or(PreferenceKey::CollapsedFolders, defaults.collapsed.clone()),
        }
    }
}

impl<S: PreferenceStore + ?Sized> TypedPreferences for S {}

#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: Mutex<HashMap<PreferenceKey, Value>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn read(&self, key: PreferenceKey) -> Result<Option<Value>> {
        Ok(self.values.lock().get(&key).cloned())
    }

    fn write(&self, key: PreferenceKey, value: Value) -> Result<()> {
        self.values.lock().insert(key, value);
        Ok(())
    }

    fn reset(&self) -> Result<()> {
        self.values.lock().clear();
        Ok(())
    }
}

/// Preferences stored in the check database, namespaced by profile.
#[derive(Clone)]
pub struct SqlitePreferences {
    storage: StorageHandle,
    profile: String,
}

impl SqlitePreferences {
    pub fn new(storage: StorageHandle, profile: impl Into<String>) -> Self {
        Self {
            storage,
            profile: profile.into(),
        }
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }
}

impl PreferenceStore for SqlitePreferences {
    fn read(&self, key: PreferenceKey) -> Result<Option<Value>> {
        self.storage.read_preference(&self.profile, key.as_ref())
    }

    fn write(&self, key: PreferenceKey, value: Value) -> Result<()> {
        self.storage
            .write_preference(&self.profile, key.as_ref(), &value)
    }

    fn reset(&self) -> Result<()> {
        let removed = self.storage.clear_preferences(&self.profile)?;
        tracing::info!(profile = %self.profile, removed, "preferences reset");
        Ok(())
    }
}
