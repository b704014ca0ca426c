//! Database layer for Tally

mod connection;
mod memory;
mod migrations;
mod repository;
mod sync_history_repository;

pub use connection::Database;
pub use memory::MemoryReplica;
pub use repository::{LedgerRepository, SqliteLedgerRepository};
pub use sync_history_repository::{SqliteSyncHistoryRepository, SyncHistoryRepository};
