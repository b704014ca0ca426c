//! Database migrations

use crate::error::Result;
use rusqlite::{Connection, OptionalExtension};

/// Current schema version
const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations
pub fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate_v1(conn)?;
    }
    if version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i32>>(0)
        })
        .optional()?
        .flatten()
        .unwrap_or(0);

    Ok(version)
}

fn apply(conn: &Connection, version: i32, statements: &[&str]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    for stmt in statements {
        tx.execute(stmt, [])?;
    }
    tx.execute("INSERT INTO schema_version (version) VALUES (?)", [version])?;
    tx.commit()?;

    tracing::info!("Migrated database to version {version}");
    Ok(())
}

/// Migration to version 1: ledger table
///
/// Timestamps are stored as whole microseconds since the epoch so that the
/// identifier column compares exactly.
fn migrate_v1(conn: &Connection) -> Result<()> {
    apply(
        conn,
        1,
        &[
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            )",
            "CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY,
                amount TEXT NOT NULL,
                category TEXT NOT NULL,
                author_name TEXT NOT NULL,
                transaction_date INTEGER NOT NULL,
                modified_date INTEGER NOT NULL,
                CHECK (modified_date >= id)
            )",
            "CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(transaction_date)",
        ],
    )
}

/// Migration to version 2: per-peer sync history
fn migrate_v2(conn: &Connection) -> Result<()> {
    apply(
        conn,
        CURRENT_VERSION,
        &[
            "CREATE TABLE IF NOT EXISTS sync_peers (
                peer_id TEXT PRIMARY KEY,
                last_synced_at INTEGER NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS sync_history (
                peer_id TEXT NOT NULL REFERENCES sync_peers(peer_id) ON DELETE CASCADE,
                transaction_id INTEGER NOT NULL,
                PRIMARY KEY (peer_id, transaction_id)
            )",
        ],
    )
}
