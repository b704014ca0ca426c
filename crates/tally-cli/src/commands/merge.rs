use std::path::Path;

use tally_core::{merge_with_report, MergeReport, SyncSnapshot, Transaction};

use crate::commands::common::{read_json_file, write_output};
use crate::error::CliError;

/// Merge two ledger files against an optional previous-sync snapshot file.
pub fn run_merge(
    local_path: &Path,
    remote_path: &Path,
    previous_path: Option<&Path>,
    output_path: Option<&Path>,
) -> Result<MergeReport, CliError> {
    let local: Vec<Transaction> = read_json_file(local_path)?;
    let remote: Vec<Transaction> = read_json_file(remote_path)?;
    let previous = previous_path
        .map(read_json_file::<SyncSnapshot>)
        .transpose()?
        .unwrap_or_default();

    let outcome = merge_with_report(&local, &remote, &previous);
    tracing::info!(
        matched = outcome.report.matched,
        conflicts = outcome.report.conflicts,
        added = outcome.report.added_from_local + outcome.report.added_from_remote,
        deleted = outcome.report.deleted_locally + outcome.report.deleted_remotely,
        "Merged ledger files"
    );

    let rendered = serde_json::to_vec_pretty(&outcome.transactions)?;
    write_output(output_path, &rendered)?;
    Ok(outcome.report)
}
