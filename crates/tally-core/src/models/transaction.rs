//! Transaction model

#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)] // f64 epoch seconds <-> i64 micros

use chrono::{DateTime, SubsecRound, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Identifier of a transaction: its creation timestamp.
///
/// Held as whole microseconds since the Unix epoch so that equality, hashing
/// and ordering are exact. On the wire it is a float count of seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(i64);

impl TransactionId {
    /// Build an identifier from float seconds since the epoch.
    ///
    /// Values that land on the same microsecond are the same identifier.
    pub fn from_epoch_seconds(seconds: f64) -> Result<Self> {
        if !seconds.is_finite() {
            return Err(Error::InvalidInput(format!(
                "Transaction identifier must be a finite timestamp, got {seconds}"
            )));
        }

        let micros = (seconds * MICROS_PER_SECOND).round();
        if micros.abs() >= i64::MAX as f64 {
            return Err(Error::InvalidInput(format!(
                "Transaction identifier {seconds} is out of range"
            )));
        }

        Self::from_micros(micros as i64)
    }

    /// Build an identifier from whole microseconds since the epoch.
    pub fn from_micros(micros: i64) -> Result<Self> {
        if DateTime::<Utc>::from_timestamp_micros(micros).is_none() {
            return Err(Error::InvalidInput(format!(
                "Transaction identifier {micros}us is out of range"
            )));
        }
        Ok(Self(micros))
    }

    /// Identifier for a record created at `created`.
    #[must_use]
    pub fn from_datetime(created: DateTime<Utc>) -> Self {
        Self(created.timestamp_micros())
    }

    /// Float seconds since the epoch, the persisted/transmitted form.
    #[must_use]
    pub fn as_epoch_seconds(self) -> f64 {
        self.0 as f64 / MICROS_PER_SECOND
    }

    /// Whole microseconds since the epoch.
    #[must_use]
    pub const fn as_micros(self) -> i64 {
        self.0
    }

    /// Creation timestamp this identifier encodes.
    #[must_use]
    pub fn as_datetime(self) -> DateTime<Utc> {
        DateTime::from_timestamp_micros(self.0).unwrap_or(DateTime::UNIX_EPOCH)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:06}", abs / 1_000_000, abs % 1_000_000)
    }
}

impl FromStr for TransactionId {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let seconds = s
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::InvalidInput(format!("Invalid transaction identifier: {s}")))?;
        Self::from_epoch_seconds(seconds)
    }
}

impl Serialize for TransactionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_epoch_seconds())
    }
}

impl<'de> Deserialize<'de> for TransactionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let seconds = f64::deserialize(deserializer)?;
        Self::from_epoch_seconds(seconds).map_err(serde::de::Error::custom)
    }
}

/// Spending category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Grocery,
    Cafe,
    Transport,
    Entertainment,
    Bills,
    Other,
}

impl Category {
    /// Every category, in display order.
    pub const ALL: [Self; 6] = [
        Self::Grocery,
        Self::Cafe,
        Self::Transport,
        Self::Entertainment,
        Self::Bills,
        Self::Other,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Grocery => "grocery",
            Self::Cafe => "cafe",
            Self::Transport => "transport",
            Self::Entertainment => "entertainment",
            Self::Bills => "bills",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == wanted)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown category: {s}")))
    }
}

/// Field changes applied by [`Transaction::with_updated_fields`].
///
/// `None` leaves the field as it was.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionUpdate {
    pub amount: Option<Decimal>,
    pub category: Option<Category>,
    pub author_name: Option<String>,
    pub transaction_date: Option<DateTime<Utc>>,
}

impl TransactionUpdate {
    /// True when the update would not change any field.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.amount.is_none()
            && self.category.is_none()
            && self.author_name.is_none()
            && self.transaction_date.is_none()
    }
}

/// A single recorded spend.
///
/// Records are immutable: edits go through [`Transaction::with_updated_fields`],
/// which always moves `modified_date` forward to the edit time. Merge
/// conflict resolution trusts `modified_date` completely, so code that builds
/// records by other means (storage, wire decoding) must carry it through
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TransactionRecord", into = "TransactionRecord")]
pub struct Transaction {
    amount: Decimal,
    category: Category,
    author_name: String,
    transaction_date: DateTime<Utc>,
    id: TransactionId,
    modified_date: DateTime<Utc>,
}

impl Transaction {
    /// Record a new spend created at `now`.
    pub fn new(
        amount: Decimal,
        category: Category,
        author_name: impl Into<String>,
        transaction_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let now = now.trunc_subsecs(6);
        Self::from_parts(
            amount,
            category,
            author_name,
            transaction_date,
            TransactionId::from_datetime(now),
            now,
        )
    }

    /// Rebuild a record from stored or transmitted fields.
    pub fn from_parts(
        amount: Decimal,
        category: Category,
        author_name: impl Into<String>,
        transaction_date: DateTime<Utc>,
        id: TransactionId,
        modified_date: DateTime<Utc>,
    ) -> Result<Self> {
        let author_name = normalize_author(author_name.into())?;
        let modified_date = modified_date.trunc_subsecs(6);
        if modified_date < id.as_datetime() {
            return Err(Error::InvalidInput(format!(
                "Transaction {id} was modified before it was created"
            )));
        }

        Ok(Self {
            amount,
            category,
            author_name,
            transaction_date: transaction_date.trunc_subsecs(6),
            id,
            modified_date,
        })
    }

    /// Return a copy with `update` applied and `modified_date` set to `now`.
    ///
    /// The identifier never changes. A `now` earlier than the creation time
    /// is clamped to the creation time.
    pub fn with_updated_fields(
        &self,
        update: TransactionUpdate,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let author_name = match update.author_name {
            Some(author_name) => normalize_author(author_name)?,
            None => self.author_name.clone(),
        };

        Ok(Self {
            amount: update.amount.unwrap_or(self.amount),
            category: update.category.unwrap_or(self.category),
            author_name,
            transaction_date: update
                .transaction_date
                .map_or(self.transaction_date, |date| date.trunc_subsecs(6)),
            id: self.id,
            modified_date: now.trunc_subsecs(6).max(self.created_date()),
        })
    }

    pub const fn id(&self) -> TransactionId {
        self.id
    }

    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    pub const fn category(&self) -> Category {
        self.category
    }

    pub fn author_name(&self) -> &str {
        &self.author_name
    }

    pub const fn transaction_date(&self) -> DateTime<Utc> {
        self.transaction_date
    }

    pub fn created_date(&self) -> DateTime<Utc> {
        self.id.as_datetime()
    }

    pub const fn modified_date(&self) -> DateTime<Utc> {
        self.modified_date
    }

    /// Whether both records describe the same logical entity.
    #[must_use]
    pub fn same_entity(&self, other: &Self) -> bool {
        self.id == other.id
    }

    /// Whether both records hold the same identifier and field values.
    ///
    /// Unlike `==`, this ignores `modified_date`.
    #[must_use]
    pub fn same_values(&self, other: &Self) -> bool {
        self.id == other.id
            && self.amount == other.amount
            && self.category == other.category
            && self.author_name == other.author_name
            && self.transaction_date == other.transaction_date
    }
}

fn normalize_author(author_name: String) -> Result<String> {
    crate::util::normalize_text_option(Some(author_name))
        .ok_or_else(|| Error::InvalidInput("Author name cannot be empty".to_string()))
}

/// Wire representation of a [`Transaction`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionRecord {
    amount: Decimal,
    category: Category,
    author_name: String,
    #[serde(with = "epoch_seconds")]
    transaction_date: DateTime<Utc>,
    created_date: TransactionId,
    #[serde(with = "epoch_seconds")]
    modified_date: DateTime<Utc>,
}

impl TryFrom<TransactionRecord> for Transaction {
    type Error = Error;

    fn try_from(value: TransactionRecord) -> Result<Self> {
        Self::from_parts(
            value.amount,
            value.category,
            value.author_name,
            value.transaction_date,
            value.created_date,
            value.modified_date,
        )
    }
}

impl From<Transaction> for TransactionRecord {
    fn from(value: Transaction) -> Self {
        Self {
            amount: value.amount,
            category: value.category,
            author_name: value.author_name,
            transaction_date: value.transaction_date,
            created_date: value.id,
            modified_date: value.modified_date,
        }
    }
}

/// Serde adapter storing timestamps as float seconds since the epoch.
pub mod epoch_seconds {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    use super::TransactionId;

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(TransactionId::from_datetime(*value).as_epoch_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let seconds = f64::deserialize(deserializer)?;
        TransactionId::from_epoch_seconds(seconds)
            .map(TransactionId::as_datetime)
            .map_err(serde::de::Error::custom)
    }
}
