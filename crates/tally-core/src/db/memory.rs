//! In-memory replica store

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::models::{PeerId, SyncPeerStatus, SyncSnapshot, Transaction, TransactionId};
use crate::sync::{snapshot_after, ReplicaStore};

/// Replica kept entirely in memory, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryReplica {
    transactions: Vec<Transaction>,
    history: HashMap<PeerId, (SyncSnapshot, DateTime<Utc>)>,
}

impl MemoryReplica {
    /// Create a replica holding `transactions` and no sync history.
    pub fn new(transactions: Vec<Transaction>) -> Self {
        let mut replica = Self {
            transactions,
            history: HashMap::new(),
        };
        replica.sort();
        replica
    }

    /// Insert `txn`, or replace the stored record with the same identifier.
    pub fn upsert(&mut self, txn: Transaction) {
        match self.transactions.iter_mut().find(|t| t.same_entity(&txn)) {
            Some(existing) => *existing = txn,
            None => self.transactions.push(txn),
        }
        self.sort();
    }

    /// Delete the record with `id`.
    pub fn remove(&mut self, id: TransactionId) -> Result<()> {
        let before = self.transactions.len();
        self.transactions.retain(|t| t.id() != id);
        if self.transactions.len() == before {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    /// Peers this replica has completed a sync with.
    pub fn peers(&self) -> Vec<SyncPeerStatus> {
        let mut peers = self
            .history
            .iter()
            .map(|(peer, (snapshot, synced_at))| SyncPeerStatus {
                peer: peer.clone(),
                last_synced_at: *synced_at,
                snapshot_len: snapshot.len(),
            })
            .collect::<Vec<_>>();
        peers.sort_by(|a, b| a.peer.cmp(&b.peer));
        peers
    }

    fn sort(&mut self) {
        self.transactions
            .sort_by_key(|t| (t.transaction_date(), t.id()));
    }
}

impl ReplicaStore for MemoryReplica {
    fn transactions(&self) -> Result<Vec<Transaction>> {
        Ok(self.transactions.clone())
    }

    fn previous_sync(&self, peer: &PeerId) -> Result<SyncSnapshot> {
        Ok(self
            .history
            .get(peer)
            .map(|(snapshot, _)| snapshot.clone())
            .unwrap_or_default())
    }

    fn commit_sync(
        &mut self,
        peer: &PeerId,
        merged: &[Transaction],
        synced_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut seen = HashSet::with_capacity(merged.len());
        self.transactions = merged
            .iter()
            .filter(|t| seen.insert(t.id()))
            .cloned()
            .collect();
        self.sort();
        self.history
            .insert(peer.clone(), (snapshot_after(merged), synced_at));
        Ok(())
    }
}
