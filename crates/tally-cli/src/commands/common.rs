use std::env;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tally_core::db::{Database, LedgerRepository};
use tally_core::util::truncate_label;
use tally_core::{Transaction, TransactionId};

use crate::config::CliConfig;
use crate::error::CliError;

/// Resolved paths and config shared by every command.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub db_path: PathBuf,
    pub config_path: PathBuf,
    pub config: CliConfig,
}

#[derive(Debug, Serialize)]
pub struct TransactionListItem {
    pub id: String,
    pub amount: String,
    pub category: String,
    pub author_name: String,
    pub transaction_date: String,
    pub modified_date: String,
}

pub fn transaction_to_list_item(txn: &Transaction) -> TransactionListItem {
    TransactionListItem {
        id: txn.id().to_string(),
        amount: txn.amount().to_string(),
        category: txn.category().to_string(),
        author_name: txn.author_name().to_string(),
        transaction_date: txn.transaction_date().to_rfc3339(),
        modified_date: txn.modified_date().to_rfc3339(),
    }
}

pub fn format_transaction_lines(transactions: &[Transaction]) -> Vec<String> {
    transactions
        .iter()
        .map(|txn| {
            format!(
                "{}  {}  {:>10}  {:<13}  {}",
                txn.id(),
                txn.transaction_date().format("%Y-%m-%d"),
                txn.amount(),
                txn.category(),
                truncate_label(txn.author_name(), 24)
            )
        })
        .collect()
}

pub fn format_sync_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

pub fn format_relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = (now - then).num_seconds().max(0);
    let minute = 60;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else {
        format!("{}w ago", diff / week)
    }
}

pub fn parse_amount(raw: &str) -> Result<Decimal, CliError> {
    Decimal::from_str(raw.trim()).map_err(|error| CliError::InvalidAmount(format!("{raw}: {error}")))
}

/// Parse an RFC 3339 timestamp or a plain date taken as midnight UTC.
pub fn parse_date(raw: &str) -> Result<DateTime<Utc>, CliError> {
    let trimmed = raw.trim();
    if let Ok(date_time) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(date_time.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|date_time| date_time.and_utc())
        .ok_or_else(|| CliError::InvalidDate(raw.to_string()))
}

pub fn normalize_transaction_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyTransactionId)
    } else {
        Ok(trimmed.to_string())
    }
}

/// Find a transaction by full identifier or unique identifier prefix.
pub fn resolve_transaction(query: &str, db: &Database) -> Result<Transaction, CliError> {
    let query = normalize_transaction_identifier(query)?;
    let ledger = db.ledger();

    if let Ok(id) = query.parse::<TransactionId>() {
        if let Some(txn) = ledger.get(id)? {
            return Ok(txn);
        }
    }

    let mut matching = ledger
        .list()?
        .into_iter()
        .filter(|txn| txn.id().to_string().starts_with(&query))
        .collect::<Vec<_>>();

    match matching.len() {
        0 => Err(CliError::TransactionNotFound(query)),
        1 => Ok(matching.remove(0)),
        _ => {
            let options = matching
                .iter()
                .take(3)
                .map(|txn| txn.id().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousTransactionId(format!(
                "Transaction id prefix `{query}` is ambiguous; candidates: {options}"
            )))
        }
    }
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>, config: &CliConfig) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_db_path
        .or_else(|| env::var_os("TALLY_DB_PATH").map(PathBuf::from))
        .or_else(|| config.db_path.clone())
    {
        return Ok(path);
    }
    default_db_path()
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("tally").join("ledger.db"))
        .ok_or_else(|| CliError::Config("Failed to resolve CLI data directory".to_string()))
}

pub fn open_database(path: &Path) -> Result<Database, CliError> {
    Ok(Database::open(path)?)
}

pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let raw = std::fs::read(path)?;
    Ok(serde_json::from_slice(&raw)?)
}

/// Write `bytes` to `path`, or to stdout when no path is given.
pub fn write_output(output_path: Option<&Path>, bytes: &[u8]) -> Result<(), CliError> {
    if let Some(path) = output_path {
        std::fs::write(path, bytes)?;
        eprintln!("{}", path.display());
    } else {
        let mut stdout = io::stdout().lock();
        stdout.write_all(bytes)?;
        stdout.write_all(b"\n")?;
    }
    Ok(())
}
