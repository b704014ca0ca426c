//! Previous-sync snapshot model

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::transaction::{Transaction, TransactionId};

/// Identifiers present in the local ledger at the end of the last completed
/// sync with one peer.
///
/// Empty before the first sync. Replaced wholesale after every sync, never
/// patched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncSnapshot(BTreeSet<TransactionId>);

impl SyncSnapshot {
    /// Snapshot for a peer never synced with.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Snapshot of the identifiers in `transactions`.
    #[must_use]
    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        transactions.iter().map(Transaction::id).collect()
    }

    pub fn contains(&self, id: TransactionId) -> bool {
        self.0.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = TransactionId> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<TransactionId> for SyncSnapshot {
    fn from_iter<I: IntoIterator<Item = TransactionId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
