//! tally-core - Core library for Tally
//!
//! This crate contains the transaction models, the three-way ledger merge,
//! the two-device sync protocol and the local storage used by the Tally CLI.

pub mod db;
pub mod error;
pub mod merge;
pub mod models;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use merge::{merge, merge_with_report, MergeReport};
pub use models::{Category, PeerId, SyncSnapshot, Transaction, TransactionId, TransactionUpdate};
