//! Storage seam used by sync sessions.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{PeerId, SyncSnapshot, Transaction};

/// A replica's ledger together with its per-peer sync history.
pub trait ReplicaStore {
    /// Every transaction in the ledger, ordered by transaction date.
    fn transactions(&self) -> Result<Vec<Transaction>>;

    /// Snapshot recorded at the last completed sync with `peer`, empty if
    /// there never was one.
    fn previous_sync(&self, peer: &PeerId) -> Result<SyncSnapshot>;

    /// Replace the ledger with `merged` and the snapshot for `peer` with the
    /// identifiers of `merged`.
    ///
    /// Both writes land together or not at all. A ledger updated without its
    /// snapshot makes the next merge misread deletions as creations.
    fn commit_sync(
        &mut self,
        peer: &PeerId,
        merged: &[Transaction],
        synced_at: DateTime<Utc>,
    ) -> Result<()>;
}
