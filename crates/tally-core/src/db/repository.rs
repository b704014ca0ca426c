//! Ledger repository implementation

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT

use std::str::FromStr;

use crate::error::{Error, Result};
use crate::models::{Category, Transaction, TransactionId};
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;

const SELECT_COLUMNS: &str =
    "SELECT id, amount, category, author_name, transaction_date, modified_date FROM transactions";

/// Trait for ledger storage operations
pub trait LedgerRepository {
    /// Store a new transaction
    fn insert(&self, txn: &Transaction) -> Result<()>;

    /// Get a transaction by identifier
    fn get(&self, id: TransactionId) -> Result<Option<Transaction>>;

    /// Overwrite the stored record that has the same identifier
    fn update(&self, txn: &Transaction) -> Result<()>;

    /// Remove a transaction
    fn delete(&self, id: TransactionId) -> Result<()>;

    /// List all transactions, oldest transaction date first
    fn list(&self) -> Result<Vec<Transaction>>;

    /// List the most recent transactions by transaction date, newest first
    fn list_recent(&self, limit: usize) -> Result<Vec<Transaction>>;

    /// Replace the whole ledger with `transactions`
    fn replace_all(&self, transactions: &[Transaction]) -> Result<()>;
}

/// `SQLite` implementation of `LedgerRepository`
pub struct SqliteLedgerRepository<'a> {
    conn: &'a Connection,
}

/// Raw column values of one `transactions` row.
struct StoredTransaction {
    id: i64,
    amount: String,
    category: String,
    author_name: String,
    transaction_date: i64,
    modified_date: i64,
}

impl TryFrom<StoredTransaction> for Transaction {
    type Error = Error;

    fn try_from(row: StoredTransaction) -> Result<Self> {
        let amount = Decimal::from_str(&row.amount)
            .map_err(|e| Error::InvalidInput(format!("Stored amount {:?}: {e}", row.amount)))?;
        Self::from_parts(
            amount,
            Category::from_str(&row.category)?,
            row.author_name,
            TransactionId::from_micros(row.transaction_date)?.as_datetime(),
            TransactionId::from_micros(row.id)?,
            TransactionId::from_micros(row.modified_date)?.as_datetime(),
        )
    }
}

impl<'a> SqliteLedgerRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a transaction row into raw columns
    fn parse_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredTransaction> {
        Ok(StoredTransaction {
            id: row.get(0)?,
            amount: row.get(1)?,
            category: row.get(2)?,
            author_name: row.get(3)?,
            transaction_date: row.get(4)?,
            modified_date: row.get(5)?,
        })
    }

    fn query(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Transaction>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, Self::parse_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(Transaction::try_from).collect()
    }

    fn write(&self, on_conflict: &str, txn: &Transaction) -> Result<usize> {
        let sql = format!(
            "INSERT INTO transactions (id, amount, category, author_name, transaction_date, modified_date)
             VALUES (?, ?, ?, ?, ?, ?) {on_conflict}"
        );
        Ok(self.conn.execute(
            &sql,
            params![
                txn.id().as_micros(),
                txn.amount().to_string(),
                txn.category().as_str(),
                txn.author_name(),
                txn.transaction_date().timestamp_micros(),
                txn.modified_date().timestamp_micros(),
            ],
        )?)
    }
}

impl LedgerRepository for SqliteLedgerRepository<'_> {
    fn insert(&self, txn: &Transaction) -> Result<()> {
        if self.get(txn.id())?.is_some() {
            return Err(Error::InvalidInput(format!(
                "Transaction {} already exists",
                txn.id()
            )));
        }
        self.write("", txn)?;
        Ok(())
    }

    fn get(&self, id: TransactionId) -> Result<Option<Transaction>> {
        let row = self
            .conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?"),
                params![id.as_micros()],
                Self::parse_row,
            )
            .optional()?;

        row.map(Transaction::try_from).transpose()
    }

    fn update(&self, txn: &Transaction) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE transactions
             SET amount = ?, category = ?, author_name = ?, transaction_date = ?, modified_date = ?
             WHERE id = ?",
            params![
                txn.amount().to_string(),
                txn.category().as_str(),
                txn.author_name(),
                txn.transaction_date().timestamp_micros(),
                txn.modified_date().timestamp_micros(),
                txn.id().as_micros(),
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(txn.id().to_string()));
        }
        Ok(())
    }

    fn delete(&self, id: TransactionId) -> Result<()> {
        let rows = self.conn.execute(
            "DELETE FROM transactions WHERE id = ?",
            params![id.as_micros()],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn list(&self) -> Result<Vec<Transaction>> {
        self.query(
            &format!("{SELECT_COLUMNS} ORDER BY transaction_date ASC, id ASC"),
            [],
        )
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<Transaction>> {
        self.query(
            &format!("{SELECT_COLUMNS} ORDER BY transaction_date DESC, id DESC LIMIT ?"),
            params![limit as i64],
        )
    }

    fn replace_all(&self, transactions: &[Transaction]) -> Result<()> {
        self.conn.execute("DELETE FROM transactions", [])?;
        // Duplicate identifiers keep the first copy.
        for txn in transactions {
            self.write("ON CONFLICT(id) DO NOTHING", txn)?;
        }
        Ok(())
    }
}
