use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;

use crate::app::actions::CheckMutations;
use crate::bulk::CheckPatch;
use crate::config::{ConfigPaths, StorageOptions};
use crate::model::{CheckId, CheckRecord, CheckStatus, CheckType};
use crate::view::{sort_checks, SortKey};

mod schema;

const CHECK_COLUMNS: &str = "id, name, url, status, order_index, folder, check_frequency, \
     last_checked, created_at, next_check_at, response_time, disabled, check_type, check_region, \
     ssl_certificate, domain_expiry, expected_status_codes, down_confirmation_attempts, timezone";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub updated: usize,
    pub removed: usize,
}

#[derive(Clone)]
pub struct StorageHandle {
    db_path: Arc<PathBuf>,
    options: Arc<StorageOptions>,
}

impl StorageHandle {
    pub fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&*self.db_path)
            .with_context(|| format!("opening database {}", self.db_path.display()))?;
        prepare_connection(&conn, &self.options)?;
        Ok(conn)
    }

    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.connect()?;
        f(&conn)
    }

    pub fn database_path(&self) -> &Path {
        &self.db_path
    }

    /// All checks in stored custom order.
    pub fn fetch_checks(&self) -> Result<Vec<CheckRecord>> {
        self.with_connection(fetch_all)
    }

    pub fn fetch_check(&self, id: &CheckId) -> Result<Option<CheckRecord>> {
        self.with_connection(|conn| fetch_one(conn, id))
    }

    /// Inserts or overwrites `records` by id. With `replace`, checks not in `records` are
    /// removed first.
    pub fn import_checks(&self, records: &[CheckRecord], replace: bool) -> Result<ImportSummary> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let mut summary = ImportSummary::default();
        if replace {
            let incoming: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();
            for stale in fetch_all(&tx)?
                .iter()
                .filter(|record| !incoming.contains(record.id.as_str()))
            {
                summary.removed += tx
                    .execute("DELETE FROM checks WHERE id = ?1", params![stale.id.as_str()])
                    .context("removing checks missing from import")?;
            }
        }
        for record in records {
            if record.id.is_blank() {
                bail!("check '{}' has no id", record.name);
            }
            let exists = fetch_one(&tx, &record.id)?.is_some();
            write_record(&tx, record)?;
            if exists {
                summary.updated += 1;
            } else {
                summary.inserted += 1;
            }
        }
        tx.commit().context("committing import")?;
        tracing::info!(
            inserted = summary.inserted,
            updated = summary.updated,
            removed = summary.removed,
            "imported checks"
        );
        Ok(summary)
    }

    pub fn read_preference(&self, profile: &str, key: &str) -> Result<Option<Value>> {
        self.with_connection(|conn| {
            let raw: Option<String> = conn
                .query_row(
                    "SELECT value FROM preferences WHERE profile = ?1 AND key = ?2",
                    params![profile, key],
                    |row| row.get(0),
                )
                .optional()
                .with_context(|| format!("reading preference {key}"))?;
            match raw {
                Some(raw) => {
                    let value = serde_json::from_str(&raw)
                        .with_context(|| format!("decoding preference {key}"))?;
                    Ok(Some(value))
                }
                None => Ok(None),
            }
        })
    }

    pub fn write_preference(&self, profile: &str, key: &str, value: &Value) -> Result<()> {
        let encoded = serde_json::to_string(value).context("encoding preference")?;
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO preferences (profile, key, value, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(profile, key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at",
                params![profile, key, encoded, now_millis()],
            )
            .with_context(|| format!("writing preference {key}"))?;
            Ok(())
        })
    }

    pub fn clear_preferences(&self, profile: &str) -> Result<usize> {
        self.with_connection(|conn| {
            let removed = conn
                .execute("DELETE FROM preferences WHERE profile = ?1", params![profile])
                .context("clearing preferences")?;
            Ok(removed)
        })
    }

    fn update_checks<F>(&self, ids: &[CheckId], what: &str, mut f: F) -> Result<usize>
    where
        F: FnMut(&Connection, &CheckId) -> Result<usize>,
    {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let mut touched = 0;
        for id in ids {
            let changed = f(&tx, id).with_context(|| format!("{what} for check {id}"))?;
            if changed == 0 {
                tracing::warn!(%id, what, "check not found");
            }
            touched += changed;
        }
        tx.commit().with_context(|| format!("committing {what}"))?;
        Ok(touched)
    }
}

impl CheckMutations for StorageHandle {
    fn reorder(&self, from: usize, to: usize) -> Result<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let records = fetch_all(&tx)?;
        let mut ordered: Vec<CheckId> = sort_checks(&records, SortKey::Custom)
            .into_iter()
            .map(|record| record.id.clone())
            .collect();
        if from >= ordered.len() || to >= ordered.len() {
            bail!(
                "reorder {from} -> {to} out of range for {} checks",
                ordered.len()
            );
        }
        let moved = ordered.remove(from);
        ordered.insert(to, moved);
        for (index, id) in ordered.iter().enumerate() {
            tx.execute(
                "UPDATE checks SET order_index = ?1 WHERE id = ?2",
                params![index as i64, id.as_str()],
            )
            .context("renumbering custom order")?;
        }
        tx.commit().context("committing reorder")?;
        Ok(())
    }

    fn delete(&self, id: &CheckId) -> Result<()> {
        self.with_connection(|conn| {
            let removed = conn
                .execute("DELETE FROM checks WHERE id = ?1", params![id.as_str()])
                .context("deleting check")?;
            if removed == 0 {
                bail!("check {id} not found");
            }
            Ok(())
        })
    }

    fn bulk_delete(&self, ids: &[CheckId]) -> Result<()> {
        let removed = self.update_checks(ids, "delete", |conn, id| {
            Ok(conn.execute("DELETE FROM checks WHERE id = ?1", params![id.as_str()])?)
        })?;
        tracing::info!(removed, requested = ids.len(), "bulk delete applied");
        Ok(())
    }

    fn toggle_status(&self, id: &CheckId, disabled: bool) -> Result<()> {
        self.with_connection(|conn| {
            let updated = conn
                .execute(
                    "UPDATE checks SET disabled = ?1 WHERE id = ?2",
                    params![disabled, id.as_str()],
                )
                .context("updating check status")?;
            if updated == 0 {
                bail!("check {id} not found");
            }
            Ok(())
        })
    }

    fn bulk_toggle_status(&self, ids: &[CheckId], disabled: bool) -> Result<()> {
        let updated = self.update_checks(ids, "status change", |conn, id| {
            Ok(conn.execute(
                "UPDATE checks SET disabled = ?1 WHERE id = ?2",
                params![disabled, id.as_str()],
            )?)
        })?;
        tracing::info!(updated, disabled, "bulk status change applied");
        Ok(())
    }

    fn set_folder(&self, id: &CheckId, folder: Option<&str>) -> Result<()> {
        let folder = folder.map(str::trim).filter(|name| !name.is_empty());
        self.with_connection(|conn| {
            let updated = conn
                .execute(
                    "UPDATE checks SET folder = ?1 WHERE id = ?2",
                    params![folder, id.as_str()],
                )
                .context("updating check folder")?;
            if updated == 0 {
                bail!("check {id} not found");
            }
            Ok(())
        })
    }

    fn bulk_update_settings(&self, ids: &[CheckId], patch: &CheckPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }
        let updated = self.update_checks(ids, "settings update", |conn, id| {
            let Some(mut record) = fetch_one(conn, id)? else {
                return Ok(0);
            };
            patch.apply_to(&mut record);
            Ok(conn.execute(
                "UPDATE checks SET check_frequency = ?1,
                                   expected_status_codes = ?2,
                                   down_confirmation_attempts = ?3,
                                   check_region = ?4,
                                   timezone = ?5
                 WHERE id = ?6",
                params![
                    record.check_frequency,
                    to_json(&record.expected_status_codes)?,
                    record.down_confirmation_attempts,
                    record.check_region.map(|region| region.to_string()),
                    record.timezone,
                    id.as_str(),
                ],
            )?)
        })?;
        tracing::info!(updated, "bulk settings update applied");
        Ok(())
    }

    fn check_now(&self, id: &CheckId) -> Result<()> {
        self.with_connection(|conn| {
            let now = now_millis();
            let updated = conn
                .execute(
                    "UPDATE checks
                     SET last_checked = ?1,
                         next_check_at = CASE
                             WHEN check_frequency IS NULL THEN next_check_at
                             ELSE ?1 + check_frequency * 1000
                         END
                     WHERE id = ?2",
                    params![now, id.as_str()],
                )
                .context("recording manual check")?;
            if updated == 0 {
                bail!("check {id} not found");
            }
            Ok(())
        })
    }
}

pub fn init(paths: &ConfigPaths, storage: &StorageOptions) -> Result<StorageHandle> {
    let db_path = if storage.database_path.as_os_str().is_empty() {
        &paths.database_path
    } else {
        &storage.database_path
    };
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating data directory {}", parent.display()))?;
    }
    let conn = Connection::open(db_path)
        .with_context(|| format!("opening database {}", db_path.display()))?;
    prepare_connection(&conn, storage)?;
    schema::apply(&conn)?;
    Ok(StorageHandle {
        db_path: Arc::new(db_path.clone()),
        options: Arc::new(storage.clone()),
    })
}

fn prepare_connection(conn: &Connection, storage: &StorageOptions) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")
        .context("setting journal_mode=WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")
        .context("setting synchronous=NORMAL")?;
    conn.pragma_update(
        None,
        "wal_autocheckpoint",
        storage.wal_autocheckpoint.to_string(),
    )
    .context("setting wal_autocheckpoint")?;
    conn.busy_timeout(std::time::Duration::from_secs(5))
        .context("setting busy timeout")?;
    Ok(())
}

fn fetch_all(conn: &Connection) -> Result<Vec<CheckRecord>> {
    let sql = format!(
        "SELECT {CHECK_COLUMNS} FROM checks ORDER BY COALESCE(order_index, 0), rowid"
    );
    let mut stmt = conn.prepare(&sql)?;
    let records = stmt
        .query_map([], record_from_row)?
        .collect::<Result<Vec<_>, _>>()
        .context("loading checks")?;
    Ok(records)
}

fn fetch_one(conn: &Connection, id: &CheckId) -> Result<Option<CheckRecord>> {
    let sql = format!("SELECT {CHECK_COLUMNS} FROM checks WHERE id = ?1");
    let record = conn
        .query_row(&sql, params![id.as_str()], record_from_row)
        .optional()
        .with_context(|| format!("loading check {id}"))?;
    Ok(record)
}

fn write_record(conn: &Connection, record: &CheckRecord) -> Result<()> {
    let response_time = record
        .response_time
        .map(i64::try_from)
        .transpose()
        .with_context(|| format!("response time of check {} out of range", record.id))?;
    let sql = format!(
        "INSERT INTO checks ({CHECK_COLUMNS})
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            url = excluded.url,
            status = excluded.status,
            order_index = excluded.order_index,
            folder = excluded.folder,
            check_frequency = excluded.check_frequency,
            last_checked = excluded.last_checked,
            created_at = excluded.created_at,
            next_check_at = excluded.next_check_at,
            response_time = excluded.response_time,
            disabled = excluded.disabled,
            check_type = excluded.check_type,
            check_region = excluded.check_region,
            ssl_certificate = excluded.ssl_certificate,
            domain_expiry = excluded.domain_expiry,
            expected_status_codes = excluded.expected_status_codes,
            down_confirmation_attempts = excluded.down_confirmation_attempts,
            timezone = excluded.timezone"
    );
    conn.execute(
        &sql,
        params![
            record.id.as_str(),
            record.name,
            record.url,
            record.status.as_str(),
            record.order_index,
            record.folder_label(),
            record.check_frequency,
            record.last_checked,
            record.created_at,
            record.next_check_at,
            response_time,
            record.disabled,
            record.check_type.as_ref(),
            record.check_region.map(|region| region.to_string()),
            to_json(&record.ssl_certificate)?,
            to_json(&record.domain_expiry)?,
            to_json(&record.expected_status_codes)?,
            record.down_confirmation_attempts,
            record.timezone,
        ],
    )
    .with_context(|| format!("writing check {}", record.id))?;
    Ok(())
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<CheckRecord> {
    let status: String = row.get(3)?;
    let check_type: String = row.get(12)?;
    let region: Option<String> = row.get(13)?;
    Ok(CheckRecord {
        id: CheckId::new(row.get::<_, String>(0)?),
        name: row.get(1)?,
        url: row.get(2)?,
        status: CheckStatus::parse(&status),
        order_index: row.get(4)?,
        folder: row.get(5)?,
        check_frequency: row.get(6)?,
        last_checked: row.get(7)?,
        created_at: row.get(8)?,
        next_check_at: row.get(9)?,
        response_time: row.get::<_, Option<i64>>(10)?.map(|ms| ms.max(0) as u64),
        disabled: row.get(11)?,
        check_type: check_type.parse::<CheckType>().unwrap_or_default(),
        check_region: region.and_then(|raw| raw.parse().ok()),
        ssl_certificate: json_column(row, 14)?,
        domain_expiry: json_column(row, 15)?,
        expected_status_codes: json_column(row, 16)?,
        down_confirmation_attempts: row.get(17)?,
        timezone: row.get(18)?,
    })
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|text| {
        serde_json::from_str(&text)
            .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
    })
    .transpose()
}

fn to_json<T: Serialize>(value: &Option<T>) -> Result<Option<String>> {
    value
        .as_ref()
        .map(|inner| serde_json::to_string(inner).context("encoding json column"))
        .transpose()
}

pub(crate) fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
