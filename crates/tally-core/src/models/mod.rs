//! Data models for Tally

mod peer;
mod sync_snapshot;
mod transaction;

pub use peer::{PeerId, SyncPeerStatus};
pub use sync_snapshot::SyncSnapshot;
pub use transaction::{epoch_seconds, Category, Transaction, TransactionId, TransactionUpdate};
