use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn apply(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS checks (
            id TEXT PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            url TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'unknown',
            order_index INTEGER,
            folder TEXT,
            check_frequency INTEGER,
            last_checked INTEGER,
            created_at INTEGER,
            next_check_at INTEGER,
            response_time INTEGER,
            disabled INTEGER NOT NULL DEFAULT 0,
            check_type TEXT NOT NULL DEFAULT 'website',
            check_region TEXT,
            ssl_certificate TEXT,
            domain_expiry TEXT,
            expected_status_codes TEXT,
            down_confirmation_attempts INTEGER,
            timezone TEXT
        );

        CREATE INDEX IF NOT EXISTS checks_order_idx ON checks (order_index);

        CREATE TABLE IF NOT EXISTS preferences (
            profile TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (profile, key)
        );
        "#,
    )
    .context("applying schema migrations")?;
    Ok(())
}
