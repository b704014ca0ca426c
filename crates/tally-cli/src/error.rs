use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] tally_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid date `{0}`: expected RFC 3339 or YYYY-MM-DD")]
    InvalidDate(String),
    #[error("Transaction ID cannot be empty")]
    EmptyTransactionId,
    #[error("Transaction not found for id/prefix: {0}")]
    TransactionNotFound(String),
    #[error("{0}")]
    AmbiguousTransactionId(String),
    #[error("Nothing to change: pass at least one of --amount, --category, --author, --date")]
    NothingToUpdate,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("No author name given. Pass --author or run `tally config init --author <NAME>`.")]
    AuthorNotConfigured,
    #[error("This device has no id yet. Run `tally config init` first.")]
    DeviceNotConfigured,
}
