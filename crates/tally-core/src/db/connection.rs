//! Database connection management

use crate::error::Result;
use crate::models::{PeerId, SyncSnapshot, Transaction};
use crate::sync::{snapshot_after, ReplicaStore};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::Path;

use super::migrations;
use super::repository::{LedgerRepository, SqliteLedgerRepository};
use super::sync_history_repository::{SqliteSyncHistoryRepository, SyncHistoryRepository};

/// Database wrapper for a local `SQLite` ledger
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open a database at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let database = Self {
            conn: Connection::open(path)?,
        };
        database.configure()?;
        database.migrate()?;
        tracing::debug!("Opened ledger database at {}", path.display());
        Ok(database)
    }

    /// Open an in-memory database (useful for testing)
    pub fn open_in_memory() -> Result<Self> {
        let database = Self {
            conn: Connection::open_in_memory()?,
        };
        database.configure()?;
        database.migrate()?;
        Ok(database)
    }

    /// Configure `SQLite` for optimal performance
    fn configure(&self) -> Result<()> {
        // In-memory databases answer "memory" instead of switching to WAL
        let mode = self
            .conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                row.get::<_, String>(0)
            })?;
        if !mode.eq_ignore_ascii_case("wal") {
            tracing::debug!(%mode, "Database kept its journal mode");
        }
        self.conn.pragma_update(None, "synchronous", "NORMAL")?;
        self.conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(())
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        migrations::run(&self.conn)
    }

    /// Get a reference to the underlying connection
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Ledger operations on this database
    pub const fn ledger(&self) -> SqliteLedgerRepository<'_> {
        SqliteLedgerRepository::new(&self.conn)
    }

    /// Sync history operations on this database
    pub const fn sync_history(&self) -> SqliteSyncHistoryRepository<'_> {
        SqliteSyncHistoryRepository::new(&self.conn)
    }
}

impl ReplicaStore for Database {
    fn transactions(&self) -> Result<Vec<Transaction>> {
        self.ledger().list()
    }

    fn previous_sync(&self, peer: &PeerId) -> Result<SyncSnapshot> {
        self.sync_history().load(peer)
    }

    fn commit_sync(
        &mut self,
        peer: &PeerId,
        merged: &[Transaction],
        synced_at: DateTime<Utc>,
    ) -> Result<()> {
        let tx = self.conn.transaction()?;
        SqliteLedgerRepository::new(&tx).replace_all(merged)?;
        SqliteSyncHistoryRepository::new(&tx).replace(peer, &snapshot_after(merged), synced_at)?;
        tx.commit()?;

        tracing::debug!(peer = %peer, count = merged.len(), "Committed sync round");
        Ok(())
    }
}
