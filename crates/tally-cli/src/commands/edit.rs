use chrono::Utc;
use tally_core::db::LedgerRepository;
use tally_core::{Transaction, TransactionUpdate};

use crate::cli::EditFields;
use crate::commands::common::{
    open_database, parse_amount, parse_date, resolve_transaction, AppContext,
};
use crate::error::CliError;

pub fn build_update(fields: &EditFields) -> Result<TransactionUpdate, CliError> {
    Ok(TransactionUpdate {
        amount: fields.amount.as_deref().map(parse_amount).transpose()?,
        category: fields.category.map(Into::into),
        author_name: fields.author.clone(),
        transaction_date: fields.date.as_deref().map(parse_date).transpose()?,
    })
}

pub fn run_edit(id: &str, fields: &EditFields, ctx: &AppContext) -> Result<Transaction, CliError> {
    let update = build_update(fields)?;
    if update.is_empty() {
        return Err(CliError::NothingToUpdate);
    }

    let db = open_database(&ctx.db_path)?;
    let existing = resolve_transaction(id, &db)?;
    let updated = existing.with_updated_fields(update, Utc::now())?;
    db.ledger().update(&updated)?;

    println!("{}", updated.id());
    Ok(updated)
}
