use tally_core::db::LedgerRepository;

use crate::commands::common::{
    format_transaction_lines, open_database, transaction_to_list_item, AppContext,
    TransactionListItem,
};
use crate::error::CliError;

pub fn run_list(limit: usize, as_json: bool, ctx: &AppContext) -> Result<(), CliError> {
    let db = open_database(&ctx.db_path)?;
    let transactions = db.ledger().list_recent(limit)?;

    if as_json {
        let json_items = transactions
            .iter()
            .map(transaction_to_list_item)
            .collect::<Vec<TransactionListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if transactions.is_empty() {
        println!("No transactions yet.");
    } else {
        for line in format_transaction_lines(&transactions) {
            println!("{line}");
        }
    }

    Ok(())
}
