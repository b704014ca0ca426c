//! Peer identifier model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Label of a device taking part in sync.
///
/// Ordered lexically; between two newly connected peers the smaller one
/// initiates the sync round.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PeerId(String);

impl PeerId {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        crate::util::normalize_text_option(Some(value.into()))
            .map(Self)
            .ok_or_else(|| Error::InvalidInput("Peer id cannot be empty".to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PeerId {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for PeerId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<PeerId> for String {
    fn from(value: PeerId) -> Self {
        value.0
    }
}

/// What a replica remembers about one sync peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPeerStatus {
    pub peer: PeerId,
    /// When the last sync round with this peer was committed.
    pub last_synced_at: DateTime<Utc>,
    /// Size of the previous-sync snapshot kept for this peer.
    pub snapshot_len: usize,
}
