use tally_core::db::LedgerRepository;
use tally_core::TransactionId;

use crate::commands::common::{open_database, resolve_transaction, AppContext};
use crate::error::CliError;

pub fn run_delete(id: &str, ctx: &AppContext) -> Result<TransactionId, CliError> {
    let db = open_database(&ctx.db_path)?;
    let txn = resolve_transaction(id, &db)?;

    db.ledger().delete(txn.id())?;
    println!("{}", txn.id());
    Ok(txn.id())
}
