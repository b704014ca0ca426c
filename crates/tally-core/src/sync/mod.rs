//! Two-device sync rounds built on the ledger merge.
//!
//! One round is asymmetric. The initiator offers its whole ledger with
//! [`SyncMode::Merge`]. The responder merges it into its own ledger, commits
//! the result and replies with [`SyncMode::Final`]. The initiator adopts that
//! list verbatim without merging again, so both sides end the round with the
//! same ledger and each records its own snapshot for the other.

mod store;

pub use store::ReplicaStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::merge::{merge_with_report, MergeReport};
use crate::models::{PeerId, SyncSnapshot, Transaction};

/// What the receiver of a payload should do with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Merge into the local ledger and reply with the result.
    Merge,
    /// Adopt as the local ledger as-is.
    Final,
}

/// A batch of transactions exchanged between two peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPayload {
    pub sender: PeerId,
    pub mode: SyncMode,
    pub transactions: Vec<Transaction>,
}

/// Serialize a payload for the transport.
pub fn encode_payload(payload: &SyncPayload) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(payload)?)
}

/// Parse a payload received from the transport.
///
/// A payload that fails to decode ends that sync attempt; nothing is merged.
pub fn decode_payload(bytes: &[u8]) -> Result<SyncPayload> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Whether `local` starts the round with a newly connected `remote`.
///
/// Exactly one of two distinct peers gets `true`, so the two sides never
/// both initiate.
pub fn should_initiate(local: &PeerId, remote: &PeerId) -> bool {
    local < remote
}

/// Result of handling an incoming payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// A `Merge` payload was merged and committed; send `reply` back.
    Merged {
        reply: SyncPayload,
        report: MergeReport,
    },
    /// A `Final` payload replaced the local ledger.
    Adopted { ledger_len: usize },
}

impl Received {
    /// The payload to send back, if any.
    pub fn into_reply(self) -> Option<SyncPayload> {
        match self {
            Self::Merged { reply, .. } => Some(reply),
            Self::Adopted { .. } => None,
        }
    }
}

/// One device's side of sync rounds.
#[derive(Debug, Clone)]
pub struct SyncSession {
    local_peer: PeerId,
}

impl SyncSession {
    pub const fn new(local_peer: PeerId) -> Self {
        Self { local_peer }
    }

    pub const fn local_peer(&self) -> &PeerId {
        &self.local_peer
    }

    /// Build the initiator's opening payload from the whole local ledger.
    pub fn offer(&self, store: &impl ReplicaStore) -> Result<SyncPayload> {
        let transactions = store.transactions()?;
        tracing::info!(
            peer = %self.local_peer,
            count = transactions.len(),
            "Offering ledger for sync"
        );
        Ok(SyncPayload {
            sender: self.local_peer.clone(),
            mode: SyncMode::Merge,
            transactions,
        })
    }

    /// Handle a payload from a peer, committing the resulting ledger.
    ///
    /// A `Merge` offer is refused when this device is the one that should
    /// initiate with the sender, so two devices never answer each other.
    pub fn receive(
        &self,
        store: &mut impl ReplicaStore,
        payload: SyncPayload,
        now: DateTime<Utc>,
    ) -> Result<Received> {
        if payload.sender == self.local_peer {
            return Err(Error::InvalidInput(format!(
                "Refusing to sync with own peer id {}",
                self.local_peer
            )));
        }

        match payload.mode {
            SyncMode::Merge if should_initiate(&self.local_peer, &payload.sender) => {
                Err(Error::InvalidInput(format!(
                    "{} must initiate sync with {}, not respond to its offer",
                    self.local_peer, payload.sender
                )))
            }
            SyncMode::Merge => self.respond(store, payload, now),
            SyncMode::Final => Self::adopt(store, payload, now),
        }
    }

    fn respond(
        &self,
        store: &mut impl ReplicaStore,
        payload: SyncPayload,
        now: DateTime<Utc>,
    ) -> Result<Received> {
        let local = store.transactions()?;
        let previous = store.previous_sync(&payload.sender)?;
        if previous.is_empty() {
            tracing::info!(peer = %payload.sender, "First sync with peer, merging as union");
        }

        let outcome = merge_with_report(&local, &payload.transactions, &previous);
        store.commit_sync(&payload.sender, &outcome.transactions, now)?;

        tracing::info!(
            peer = %payload.sender,
            count = outcome.transactions.len(),
            conflicts = outcome.report.conflicts,
            "Merged ledger from peer"
        );

        Ok(Received::Merged {
            reply: SyncPayload {
                sender: self.local_peer.clone(),
                mode: SyncMode::Final,
                transactions: outcome.transactions,
            },
            report: outcome.report,
        })
    }

    fn adopt(
        store: &mut impl ReplicaStore,
        payload: SyncPayload,
        now: DateTime<Utc>,
    ) -> Result<Received> {
        store.commit_sync(&payload.sender, &payload.transactions, now)?;
        tracing::info!(
            peer = %payload.sender,
            count = payload.transactions.len(),
            "Adopted merged ledger from peer"
        );
        Ok(Received::Adopted {
            ledger_len: payload.transactions.len(),
        })
    }
}

/// Snapshot a replica records after committing `merged`.
pub fn snapshot_after(merged: &[Transaction]) -> SyncSnapshot {
    SyncSnapshot::from_transactions(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryReplica;
    use crate::models::{Category, TransactionUpdate};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(seconds, 0).unwrap()
    }

    fn peer(name: &str) -> PeerId {
        PeerId::new(name).unwrap()
    }

    fn spend(created: i64, cents: i64, author: &str) -> Transaction {
        Transaction::new(
            Decimal::new(cents, 2),
            Category::Cafe,
            author,
            at(created - 10),
            at(created),
        )
        .unwrap()
    }

    /// Run a full round from `initiator` to `responder`.
    fn round(
        initiator: (&SyncSession, &mut MemoryReplica),
        responder: (&SyncSession, &mut MemoryReplica),
        now: DateTime<Utc>,
    ) {
        let offer = initiator.0.offer(&*initiator.1).unwrap();
        let wire = encode_payload(&offer).unwrap();

        let reply = responder
            .0
            .receive(responder.1, decode_payload(&wire).unwrap(), now)
            .unwrap()
            .into_reply()
            .unwrap();
        let wire = encode_payload(&reply).unwrap();

        let adopted = initiator
            .0
            .receive(initiator.1, decode_payload(&wire).unwrap(), now)
            .unwrap();
        assert!(adopted.into_reply().is_none());
    }

    #[test]
    fn test_should_initiate_picks_exactly_one_side() {
        let a = peer("device-a");
        let b = peer("device-b");
        assert!(should_initiate(&a, &b));
        assert!(!should_initiate(&b, &a));
        assert!(!should_initiate(&a, &a));
    }

    #[test]
    fn test_round_converges_both_replicas() {
        let phone = SyncSession::new(peer("phone"));
        let tablet = SyncSession::new(peer("tablet"));
        let mut phone_store = MemoryReplica::new(vec![spend(100, -450, "alice")]);
        let mut tablet_store = MemoryReplica::new(vec![spend(200, -900, "bob")]);

        round(
            (&phone, &mut phone_store),
            (&tablet, &mut tablet_store),
            at(1_000),
        );

        let phone_ledger = phone_store.transactions().unwrap();
        assert_eq!(phone_ledger.len(), 2);
        assert_eq!(phone_ledger, tablet_store.transactions().unwrap());
        assert_eq!(
            phone_store.previous_sync(tablet.local_peer()).unwrap(),
            tablet_store.previous_sync(phone.local_peer()).unwrap()
        );
    }

    #[test]
    fn test_second_round_propagates_deletes_and_edits() {
        let phone = SyncSession::new(peer("phone"));
        let tablet = SyncSession::new(peer("tablet"));
        let coffee = spend(100, -450, "alice");
        let bus = spend(200, -275, "bob");
        let mut phone_store = MemoryReplica::new(vec![coffee.clone()]);
        let mut tablet_store = MemoryReplica::new(vec![bus.clone()]);

        round(
            (&phone, &mut phone_store),
            (&tablet, &mut tablet_store),
            at(1_000),
        );

        phone_store.remove(bus.id()).unwrap();
        let edited = coffee
            .with_updated_fields(
                TransactionUpdate {
                    amount: Some(Decimal::new(-500, 2)),
                    ..TransactionUpdate::default()
                },
                at(1_500),
            )
            .unwrap();
        tablet_store.upsert(edited.clone());

        round(
            (&phone, &mut phone_store),
            (&tablet, &mut tablet_store),
            at(2_000),
        );

        assert_eq!(phone_store.transactions().unwrap(), vec![edited.clone()]);
        assert_eq!(tablet_store.transactions().unwrap(), vec![edited]);
    }

    #[test]
    fn test_receive_rejects_own_payload() {
        let phone = SyncSession::new(peer("phone"));
        let mut store = MemoryReplica::default();
        let offer = phone.offer(&store).unwrap();

        assert!(phone.receive(&mut store, offer, at(10)).is_err());
    }

    #[test]
    fn test_merge_reply_is_final_and_reports_counts() {
        let tablet = SyncSession::new(peer("tablet"));
        let mut store = MemoryReplica::new(vec![spend(100, -1, "alice")]);
        let incoming = SyncPayload {
            sender: peer("phone"),
            mode: SyncMode::Merge,
            transactions: vec![spend(200, -2, "bob")],
        };

        let Received::Merged { reply, report } = tablet.receive(&mut store, incoming, at(10)).unwrap()
        else {
            panic!("merge payload should produce a reply");
        };
        assert_eq!(reply.mode, SyncMode::Final);
        assert_eq!(reply.sender, peer("tablet"));
        assert_eq!(reply.transactions.len(), 2);
        assert_eq!(report.added_from_local, 1);
        assert_eq!(report.added_from_remote, 1);
        assert_eq!(
            store.previous_sync(&peer("phone")).unwrap(),
            snapshot_after(&reply.transactions)
        );
    }

    #[test]
    fn test_only_the_designated_initiator_offers() {
        let phone = SyncSession::new(peer("device-a"));
        let tablet = SyncSession::new(peer("device-b"));
        let shared = spend(100, -100, "alice");
        let phone_edit = shared
            .with_updated_fields(
                TransactionUpdate {
                    amount: Some(Decimal::new(200, 2)),
                    ..TransactionUpdate::default()
                },
                at(500),
            )
            .unwrap();
        let tablet_edit = shared
            .with_updated_fields(
                TransactionUpdate {
                    amount: Some(Decimal::new(300, 2)),
                    ..TransactionUpdate::default()
                },
                at(500),
            )
            .unwrap();
        let mut phone_store = MemoryReplica::new(vec![phone_edit.clone()]);
        let mut tablet_store = MemoryReplica::new(vec![tablet_edit]);

        // Both sides offer at once.
        let phone_offer = phone.offer(&phone_store).unwrap();
        let tablet_offer = tablet.offer(&tablet_store).unwrap();

        let refused = phone.receive(&mut phone_store, tablet_offer, at(1_000));
        assert!(matches!(refused, Err(Error::InvalidInput(_))));
        assert_eq!(phone_store.transactions().unwrap(), vec![phone_edit.clone()]);
        assert!(phone_store.previous_sync(tablet.local_peer()).unwrap().is_empty());

        let reply = tablet
            .receive(&mut tablet_store, phone_offer, at(1_000))
            .unwrap()
            .into_reply()
            .unwrap();
        phone.receive(&mut phone_store, reply, at(1_000)).unwrap();

        assert_eq!(
            phone_store.transactions().unwrap(),
            tablet_store.transactions().unwrap()
        );
        assert_eq!(phone_store.transactions().unwrap(), vec![phone_edit]);
    }

    #[test]
    fn test_decode_rejects_malformed_payload() {
        assert!(decode_payload(b"{\"sender\":\"phone\",\"mode\":\"merge\"}").is_err());
        assert!(decode_payload(b"not json").is_err());
    }
}
