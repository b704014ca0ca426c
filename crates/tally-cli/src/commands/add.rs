use chrono::Utc;
use tally_core::db::LedgerRepository;
use tally_core::{Category, Transaction};

use crate::commands::common::{open_database, parse_amount, parse_date, AppContext};
use crate::error::CliError;

pub fn run_add(
    amount: &str,
    category: Category,
    author: Option<&str>,
    date: Option<&str>,
    ctx: &AppContext,
) -> Result<Transaction, CliError> {
    let amount = parse_amount(amount)?;
    let author = author
        .map(str::to_string)
        .or_else(|| ctx.config.author_name())
        .ok_or(CliError::AuthorNotConfigured)?;

    let now = Utc::now();
    let transaction_date = date.map(parse_date).transpose()?.unwrap_or(now);
    let txn = Transaction::new(amount, category, author, transaction_date, now)?;

    let db = open_database(&ctx.db_path)?;
    db.ledger().insert(&txn)?;
    tracing::debug!(id = %txn.id(), "Recorded transaction");

    println!("{}", txn.id());
    Ok(txn)
}
