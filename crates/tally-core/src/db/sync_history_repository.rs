//! Sync history repository implementation

use crate::error::Result;
use crate::models::{PeerId, SyncPeerStatus, SyncSnapshot, TransactionId};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

/// Trait for per-peer previous-sync snapshot storage
pub trait SyncHistoryRepository {
    /// Load the snapshot recorded for `peer` (empty if never synced)
    fn load(&self, peer: &PeerId) -> Result<SyncSnapshot>;

    /// Replace the snapshot recorded for `peer`
    fn replace(&self, peer: &PeerId, snapshot: &SyncSnapshot, synced_at: DateTime<Utc>)
        -> Result<()>;

    /// List every peer with a recorded sync, ordered by peer id
    fn peers(&self) -> Result<Vec<SyncPeerStatus>>;
}

/// `SQLite` implementation of `SyncHistoryRepository`
pub struct SqliteSyncHistoryRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteSyncHistoryRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl SyncHistoryRepository for SqliteSyncHistoryRepository<'_> {
    fn load(&self, peer: &PeerId) -> Result<SyncSnapshot> {
        let mut stmt = self
            .conn
            .prepare("SELECT transaction_id FROM sync_history WHERE peer_id = ?")?;

        let ids = stmt
            .query_map(params![peer.as_str()], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        ids.into_iter().map(TransactionId::from_micros).collect()
    }

    fn replace(
        &self,
        peer: &PeerId,
        snapshot: &SyncSnapshot,
        synced_at: DateTime<Utc>,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sync_peers (peer_id, last_synced_at) VALUES (?, ?)
             ON CONFLICT(peer_id) DO UPDATE SET last_synced_at = excluded.last_synced_at",
            params![peer.as_str(), synced_at.timestamp_micros()],
        )?;
        self.conn.execute(
            "DELETE FROM sync_history WHERE peer_id = ?",
            params![peer.as_str()],
        )?;

        let mut insert = self
            .conn
            .prepare("INSERT INTO sync_history (peer_id, transaction_id) VALUES (?, ?)")?;
        for id in snapshot.iter() {
            insert.execute(params![peer.as_str(), id.as_micros()])?;
        }

        tracing::debug!(peer = %peer, size = snapshot.len(), "Recorded sync snapshot");
        Ok(())
    }

    fn peers(&self) -> Result<Vec<SyncPeerStatus>> {
        let mut stmt = self.conn.prepare(
            "SELECT p.peer_id, p.last_synced_at, COUNT(h.transaction_id)
             FROM sync_peers p
             LEFT JOIN sync_history h ON h.peer_id = p.peer_id
             GROUP BY p.peer_id
             ORDER BY p.peer_id ASC",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, usize>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(peer, synced_at, snapshot_len)| {
                Ok(SyncPeerStatus {
                    peer: PeerId::new(peer)?,
                    last_synced_at: TransactionId::from_micros(synced_at)?.as_datetime(),
                    snapshot_len,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use chrono::TimeZone;

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(seconds, 0).unwrap()
    }

    fn snapshot(seconds: &[i64]) -> SyncSnapshot {
        seconds
            .iter()
            .map(|s| TransactionId::from_datetime(at(*s)))
            .collect()
    }

    #[test]
    fn test_load_unknown_peer_is_empty() {
        let db = setup();
        let repo = SqliteSyncHistoryRepository::new(db.connection());

        let loaded = repo.load(&PeerId::new("tablet").unwrap()).unwrap();
        assert!(loaded.is_empty());
        assert!(repo.peers().unwrap().is_empty());
    }

    #[test]
    fn test_replace_overwrites_previous_snapshot() {
        let db = setup();
        let repo = SqliteSyncHistoryRepository::new(db.connection());
        let peer = PeerId::new("tablet").unwrap();

        repo.replace(&peer, &snapshot(&[1, 2, 3]), at(10)).unwrap();
        repo.replace(&peer, &snapshot(&[3, 4]), at(20)).unwrap();

        assert_eq!(repo.load(&peer).unwrap(), snapshot(&[3, 4]));

        let peers = repo.peers().unwrap();
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].last_synced_at, at(20));
        assert_eq!(peers[0].snapshot_len, 2);
    }

    #[test]
    fn test_snapshots_are_kept_per_peer() {
        let db = setup();
        let repo = SqliteSyncHistoryRepository::new(db.connection());
        let tablet = PeerId::new("tablet").unwrap();
        let laptop = PeerId::new("laptop").unwrap();

        repo.replace(&tablet, &snapshot(&[1]), at(10)).unwrap();
        repo.replace(&laptop, &SyncSnapshot::empty(), at(11)).unwrap();

        assert_eq!(repo.load(&tablet).unwrap(), snapshot(&[1]));
        assert!(repo.load(&laptop).unwrap().is_empty());

        let names = repo
            .peers()
            .unwrap()
            .into_iter()
            .map(|status| status.peer.to_string())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["laptop", "tablet"]);
    }
}
