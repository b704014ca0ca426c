//! Three-way merge of two diverged ledger replicas.
//!
//! Given the local and remote transaction lists and the identifiers the local
//! replica held at the last completed sync with that remote, [`merge`]
//! produces the reconciled ledger:
//!
//! - an identifier on both sides keeps the copy with the later
//!   `modified_date` (the remote copy on an exact tie), wholesale;
//! - an identifier on one side only is a creation if it is absent from the
//!   previous-sync snapshot, and a deletion by the other side if present;
//! - the result is sorted by `transaction_date`, ascending, with the
//!   identifier breaking ties.
//!
//! With an empty snapshot nothing can be classified as deleted, so the first
//! sync between two devices is a pure union.
//!
//! The merge trusts `modified_date` and the snapshot completely. Callers must
//! bump `modified_date` on every edit and persist the snapshot together with
//! the ledger it describes.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::models::{SyncSnapshot, Transaction, TransactionId};

/// Counters describing what a merge did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// Identifiers present on both sides.
    pub matched: usize,
    /// Matched identifiers whose two copies differed in a user-visible field.
    pub conflicts: usize,
    /// Remote-only identifiers kept as new.
    pub added_from_remote: usize,
    /// Local-only identifiers kept as new.
    pub added_from_local: usize,
    /// Remote-only identifiers dropped because the local side deleted them.
    pub deleted_locally: usize,
    /// Local-only identifiers dropped because the remote side deleted them.
    pub deleted_remotely: usize,
}

/// Merged ledger plus a report of how it was reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub transactions: Vec<Transaction>,
    pub report: MergeReport,
}

/// Merge `local` and `remote` against the previous-sync snapshot.
///
/// Duplicate identifiers inside one list keep the first occurrence.
#[must_use]
pub fn merge(
    local: &[Transaction],
    remote: &[Transaction],
    previous_sync: &SyncSnapshot,
) -> Vec<Transaction> {
    merge_with_report(local, remote, previous_sync).transactions
}

/// Same as [`merge`], also returning a [`MergeReport`].
#[must_use]
pub fn merge_with_report(
    local: &[Transaction],
    remote: &[Transaction],
    previous_sync: &SyncSnapshot,
) -> MergeOutcome {
    let mut local_by_id: HashMap<TransactionId, &Transaction> = HashMap::with_capacity(local.len());
    for txn in local {
        local_by_id.entry(txn.id()).or_insert(txn);
    }

    let mut processed: HashSet<TransactionId> = HashSet::with_capacity(local.len() + remote.len());
    let mut merged = Vec::with_capacity(local.len().max(remote.len()));
    let mut report = MergeReport::default();

    for remote_txn in remote {
        let id = remote_txn.id();
        if !processed.insert(id) {
            continue;
        }

        if let Some(local_txn) = local_by_id.get(&id) {
            report.matched += 1;
            if !local_txn.same_values(remote_txn) {
                report.conflicts += 1;
                tracing::trace!(%id, "Resolving concurrent edit by modified date");
            }
            merged.push(most_recent(local_txn, remote_txn).clone());
        } else if previous_sync.contains(id) {
            report.deleted_locally += 1;
        } else {
            report.added_from_remote += 1;
            merged.push(remote_txn.clone());
        }
    }

    for local_txn in local {
        let id = local_txn.id();
        if !processed.insert(id) {
            continue;
        }

        if previous_sync.contains(id) {
            report.deleted_remotely += 1;
        } else {
            report.added_from_local += 1;
            merged.push(local_txn.clone());
        }
    }

    merged.sort_by_key(|t| (t.transaction_date(), t.id()));

    tracing::debug!(
        total = merged.len(),
        matched = report.matched,
        conflicts = report.conflicts,
        added_from_remote = report.added_from_remote,
        added_from_local = report.added_from_local,
        deleted_locally = report.deleted_locally,
        deleted_remotely = report.deleted_remotely,
        "Merged ledger replicas"
    );

    MergeOutcome {
        transactions: merged,
        report,
    }
}

/// The copy with the strictly later `modified_date`; `second` on a tie.
#[must_use]
pub fn most_recent<'a>(first: &'a Transaction, second: &'a Transaction) -> &'a Transaction {
    if first.modified_date() > second.modified_date() {
        first
    } else {
        second
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, TransactionUpdate};
    use chrono::{DateTime, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(seconds, 0).unwrap()
    }

    /// Transaction created at `created`, spent at `spent`.
    fn txn(created: i64, spent: i64, cents: i64) -> Transaction {
        Transaction::new(
            Decimal::new(cents, 2),
            Category::Grocery,
            "alice",
            at(spent),
            at(created),
        )
        .unwrap()
    }

    fn edit(txn: &Transaction, cents: i64, now: i64) -> Transaction {
        txn.with_updated_fields(
            TransactionUpdate {
                amount: Some(Decimal::new(cents, 2)),
                ..TransactionUpdate::default()
            },
            at(now),
        )
        .unwrap()
    }

    fn ids(transactions: &[Transaction]) -> Vec<TransactionId> {
        transactions.iter().map(Transaction::id).collect()
    }

    fn sorted_by_date(mut transactions: Vec<Transaction>) -> Vec<Transaction> {
        transactions.sort_by_key(|t| (t.transaction_date(), t.id()));
        transactions
    }

    fn assert_sorted(transactions: &[Transaction]) {
        assert!(transactions
            .windows(2)
            .all(|pair| pair[0].transaction_date() <= pair[1].transaction_date()));
    }

    #[test]
    fn test_empty_inputs_merge_to_empty() {
        assert!(merge(&[], &[], &SyncSnapshot::empty()).is_empty());
    }

    #[test]
    fn test_first_sync_local_only_is_kept() {
        let a = txn(100, 10, -500);
        let b = txn(200, 5, -700);

        let merged = merge(&[a.clone(), b.clone()], &[], &SyncSnapshot::empty());
        assert_eq!(merged, vec![b, a]);
    }

    #[test]
    fn test_first_sync_remote_only_is_kept() {
        let a = txn(100, 10, -500);
        let b = txn(200, 20, -700);

        let merged = merge(&[], &[b.clone(), a.clone()], &SyncSnapshot::empty());
        assert_eq!(merged, vec![a, b]);
    }

    #[test]
    fn test_first_sync_is_pure_union() {
        let a = txn(100, 10, -500);
        let b = txn(200, 20, -700);
        let c = txn(300, 30, -900);

        let merged = merge(&[a.clone(), b.clone()], &[c.clone()], &SyncSnapshot::empty());
        assert_eq!(merged, vec![a, b, c]);
    }

    #[test]
    fn test_no_divergence_returns_local_contents() {
        let local = vec![txn(300, 30, -1), txn(100, 10, -2), txn(200, 20, -3)];
        let remote = local.clone();
        let previous = SyncSnapshot::from_transactions(&local);

        let outcome = merge_with_report(&local, &remote, &previous);
        assert_eq!(outcome.transactions, sorted_by_date(local));
        assert_eq!(outcome.report.matched, 3);
        assert_eq!(outcome.report.conflicts, 0);
    }

    #[test]
    fn test_new_on_local_since_last_sync() {
        let base = vec![txn(100, 10, -1), txn(200, 20, -2)];
        let previous = SyncSnapshot::from_transactions(&base);
        let mut local = base.clone();
        local.push(txn(300, 15, -3));

        let merged = merge(&local, &base, &previous);
        assert_eq!(merged, sorted_by_date(local));
    }

    #[test]
    fn test_new_on_remote_since_last_sync() {
        let base = vec![txn(100, 10, -1), txn(200, 20, -2)];
        let previous = SyncSnapshot::from_transactions(&base);
        let mut remote = base.clone();
        remote.push(txn(300, 15, -3));

        let outcome = merge_with_report(&base, &remote, &previous);
        assert_eq!(outcome.transactions, sorted_by_date(remote));
        assert_eq!(outcome.report.added_from_remote, 1);
    }

    #[test]
    fn test_update_conflict_later_modified_date_wins() {
        let x = txn(100, 10, -1000);
        let y = txn(200, 20, -2000);
        let previous = SyncSnapshot::from_transactions(&[x.clone(), y.clone()]);

        let local_x = edit(&x, -1100, 500);
        let remote_x = x
            .with_updated_fields(
                TransactionUpdate {
                    amount: Some(Decimal::new(-1200, 2)),
                    category: Some(Category::Bills),
                    ..TransactionUpdate::default()
                },
                at(600),
            )
            .unwrap();

        let outcome = merge_with_report(
            &[local_x, y.clone()],
            &[remote_x.clone(), y.clone()],
            &previous,
        );
        assert_eq!(outcome.transactions, vec![remote_x, y]);
        assert_eq!(outcome.report.conflicts, 1);
    }

    #[test]
    fn test_update_conflict_local_wins_when_later() {
        let x = txn(100, 10, -1000);
        let previous = SyncSnapshot::from_transactions(&[x.clone()]);

        let local_x = edit(&x, -1100, 700);
        let remote_x = edit(&x, -1200, 600);

        let merged = merge(&[local_x.clone()], &[remote_x], &previous);
        assert_eq!(merged, vec![local_x]);
    }

    #[test]
    fn test_update_conflict_tie_prefers_remote() {
        let x = txn(100, 10, -1000);
        let previous = SyncSnapshot::from_transactions(&[x.clone()]);

        let local_x = edit(&x, -1100, 600);
        let remote_x = edit(&x, -1200, 600);

        let merged = merge(&[local_x], &[remote_x.clone()], &previous);
        assert_eq!(merged, vec![remote_x]);
    }

    #[test]
    fn test_local_delete_is_respected() {
        let x = txn(100, 10, -1);
        let y = txn(200, 20, -2);
        let remote = vec![x.clone(), y.clone()];
        let previous = SyncSnapshot::from_transactions(&remote);

        let outcome = merge_with_report(&[y.clone()], &remote, &previous);
        assert_eq!(outcome.transactions, vec![y]);
        assert_ne!(outcome.transactions, remote);
        assert_eq!(outcome.report.deleted_locally, 1);
    }

    #[test]
    fn test_remote_delete_is_respected() {
        let x = txn(100, 10, -1);
        let y = txn(200, 20, -2);
        let local = vec![x.clone(), y.clone()];
        let previous = SyncSnapshot::from_transactions(&local);

        let outcome = merge_with_report(&local, &[x.clone()], &previous);
        assert_eq!(outcome.transactions, vec![x]);
        assert_eq!(outcome.report.deleted_remotely, 1);
    }

    #[test]
    fn test_local_delete_beats_remote_update() {
        let x = txn(100, 10, -1);
        let y = txn(200, 20, -2);
        let previous = SyncSnapshot::from_transactions(&[x.clone(), y.clone()]);

        let remote_x = edit(&x, -99, 900);
        let merged = merge(&[y.clone()], &[remote_x, y.clone()], &previous);
        assert_eq!(ids(&merged), vec![y.id()]);
    }

    #[test]
    fn test_remote_delete_beats_local_update() {
        let x = txn(100, 10, -1);
        let y = txn(200, 20, -2);
        let previous = SyncSnapshot::from_transactions(&[x.clone(), y.clone()]);

        let local_x = edit(&x, -99, 900);
        let merged = merge(&[local_x, y.clone()], &[y.clone()], &previous);
        assert_eq!(ids(&merged), vec![y.id()]);
    }

    #[test]
    fn test_concurrent_deletes_on_both_sides() {
        let a = txn(100, 10, -1);
        let b = txn(200, 20, -2);
        let c = txn(300, 30, -3);
        let d = txn(400, 40, -4);
        let base = vec![a.clone(), b.clone(), c.clone()];
        let previous = SyncSnapshot::from_transactions(&base);

        let local = vec![b.clone(), c.clone(), d.clone()];
        let remote = vec![a, c.clone()];

        let merged = merge(&local, &remote, &previous);
        assert_eq!(merged, vec![c, d]);
    }

    #[test]
    fn test_duplicate_identifiers_keep_first_occurrence() {
        let x = txn(100, 10, -1);
        let later = edit(&x, -2, 500);

        let merged = merge(&[x.clone(), later.clone()], &[], &SyncSnapshot::empty());
        assert_eq!(merged, vec![x.clone()]);

        let merged = merge(&[], &[later.clone(), x], &SyncSnapshot::empty());
        assert_eq!(merged, vec![later]);
    }

    #[test]
    fn test_merge_does_not_depend_on_input_order() {
        let a = txn(100, 10, -1);
        let b = txn(200, 20, -2);
        let c = txn(300, 30, -3);
        let same_day = txn(400, 10, -4);

        let forward = merge(
            &[a.clone(), b.clone(), same_day.clone()],
            &[c.clone()],
            &SyncSnapshot::empty(),
        );
        let backward = merge(&[same_day, b, a], &[c], &SyncSnapshot::empty());
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_equal_transaction_dates_are_ordered_by_identifier() {
        let first = txn(100, 10, -1);
        let second = txn(200, 10, -2);

        let forward = merge(&[first.clone(), second.clone()], &[], &SyncSnapshot::empty());
        let backward = merge(&[second.clone()], &[first.clone()], &SyncSnapshot::empty());
        assert_eq!(ids(&forward), vec![first.id(), second.id()]);
        assert_eq!(ids(&backward), vec![first.id(), second.id()]);
    }

    #[test]
    fn test_modified_date_only_difference_is_not_a_conflict() {
        let original = txn(100, 10, -1);
        let touched = original
            .with_updated_fields(TransactionUpdate::default(), at(900))
            .unwrap();

        let outcome = merge_with_report(
            &[touched.clone()],
            &[original.clone()],
            &SyncSnapshot::from_transactions(&[original]),
        );
        assert_eq!(outcome.report.matched, 1);
        assert_eq!(outcome.report.conflicts, 0);
        assert_eq!(outcome.transactions, vec![touched]);
    }

    #[test]
    fn test_merge_result_is_a_fixed_point() {
        let a = txn(100, 40, -1);
        let b = txn(200, 10, -2);
        let c = txn(300, 30, -3);
        let d = txn(400, 20, -4);
        let previous = SyncSnapshot::from_transactions(&[a.clone(), b.clone()]);
        let local = vec![edit(&a, -10, 800), c];
        let remote = vec![a, b, d];

        let merged = merge(&local, &remote, &previous);
        let again = merge(
            &merged,
            &merged,
            &SyncSnapshot::from_transactions(&merged),
        );
        assert_eq!(again, merged);
    }

    #[test]
    fn test_output_is_always_sorted_by_transaction_date() {
        // Small deterministic generator so every run covers the same inputs.
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = move |bound: i64| {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            i64::try_from(seed % u64::try_from(bound).unwrap()).unwrap()
        };

        for round in 0..50 {
            let base: Vec<Transaction> = (0..8)
                .map(|i| txn(1_000 + round * 100 + i, next(1_000), next(10_000)))
                .collect();
            let previous = SyncSnapshot::from_transactions(&base);

            let mut local = Vec::new();
            let mut remote = Vec::new();
            for t in &base {
                for side in [&mut local, &mut remote] {
                    if next(4) == 0 {
                        continue;
                    }
                    if next(3) == 0 {
                        side.push(edit(t, next(500), 5_000 + next(100)));
                    } else {
                        side.push(t.clone());
                    }
                }
            }
            for i in 0..next(3) {
                local.push(txn(50_000 + round * 10 + i, next(1_000), -1));
            }
            for i in 0..next(3) {
                remote.push(txn(90_000 + round * 10 + i, next(1_000), -1));
            }

            let merged = merge(&local, &remote, &previous);
            assert_sorted(&merged);

            let unique: HashSet<TransactionId> = ids(&merged).into_iter().collect();
            assert_eq!(unique.len(), merged.len());
        }
    }
}
