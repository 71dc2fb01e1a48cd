//! Batch Reconciler
//!
//! Applies a [`ChangeSet`] to the record store table by table, row by row.
//! Writes are awaited one at a time so later rows observe earlier ones. A
//! failed row is recorded and skipped; nothing already written is undone.
//!
//! Two tables get extra handling before the default create/update rule:
//! - `setlist_songs`: rows are grouped by `setlist_id` (rows without one share
//!   a single "new" group) and each group's `order_index` is rewritten to
//!   `0..N-1` in array order.
//! - `concert_setlists`: `status` is always reset to `""`.

use indexmap::IndexMap;
use livith_common::Table;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::row::{ChangeSet, Row, RowState};
use crate::store::RecordStore;

/// Number of failure messages shown in a summary
const SUMMARY_LIMIT: usize = 3;

/// Outcome of one reconcile run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileReport {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    /// `"<table> <create|update> failed: <message>"`, in processing order
    pub failures: Vec<String>,
}

impl ReconcileReport {
    /// True when every attempted write succeeded
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Up to three failure messages, one per line, with `...` if truncated
    pub fn summary(&self) -> String {
        let mut summary = self
            .failures
            .iter()
            .take(SUMMARY_LIMIT)
            .cloned()
            .collect::<Vec<_>>()
            .join("\n");
        if self.failures.len() > SUMMARY_LIMIT {
            summary.push_str("\n...");
        }
        summary
    }
}

/// Applies change-sets to a [`RecordStore`]
pub struct BatchReconciler<'a> {
    store: &'a dyn RecordStore,
}

impl<'a> BatchReconciler<'a> {
    pub fn new(store: &'a dyn RecordStore) -> Self {
        Self { store }
    }

    /// Apply every table of `changes` in order
    pub async fn run(&self, changes: &ChangeSet) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for (table, rows) in changes.iter() {
            match table {
                Table::SetlistSongs => {
                    for group in group_by_setlist(rows).into_values() {
                        for (position, row) in group.into_iter().enumerate() {
                            let mut row = row.clone();
                            row.set("order_index", position as i64);
                            self.apply(table, &row, &mut report).await;
                        }
                    }
                }
                Table::ConcertSetlists => {
                    for row in rows {
                        let mut row = row.clone();
                        row.set("status", "");
                        self.apply(table, &row, &mut report).await;
                    }
                }
                _ => {
                    for row in rows {
                        self.apply(table, row, &mut report).await;
                    }
                }
            }
        }

        info!(
            "Reconcile finished: {} created, {} updated, {} skipped, {} failed",
            report.created,
            report.updated,
            report.skipped,
            report.failures.len()
        );
        report
    }

    /// Default rule: create new rows, update modified rows, skip the rest
    async fn apply(&self, table: Table, row: &Row, report: &mut ReconcileReport) {
        match (row.state, row.identity) {
            (RowState::New, _) => match self.store.create(table, &row.payload()).await {
                Ok(_) => report.created += 1,
                Err(e) => record_failure(report, table, "create", e),
            },
            (RowState::Modified, Some(id)) => {
                match self.store.update(table, id, &row.payload()).await {
                    Ok(_) => report.updated += 1,
                    Err(e) => record_failure(report, table, "update", e),
                }
            }
            (RowState::Modified, None) => {
                debug!("Skipping modified {} row without id", table);
                report.skipped += 1;
            }
            (RowState::Clean, _) => report.skipped += 1,
        }
    }
}

fn record_failure(
    report: &mut ReconcileReport,
    table: Table,
    operation: &str,
    error: impl std::fmt::Display,
) {
    let message = format!("{} {} failed: {}", table, operation, error);
    warn!("{}", message);
    report.failures.push(message);
}

/// Group key for a `setlist_id` value; `None` is the shared "new" group
///
/// `7`, `7.0` and `" 7 "` all key the same group.
fn setlist_key(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Membership rows grouped by setlist, groups in first-appearance order
fn group_by_setlist(rows: &[Row]) -> IndexMap<Option<i64>, Vec<&Row>> {
    let mut groups: IndexMap<Option<i64>, Vec<&Row>> = IndexMap::new();
    for row in rows {
        groups
            .entry(setlist_key(row.get("setlist_id")))
            .or_default()
            .push(row);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_summary_truncates_after_three() {
        let report = ReconcileReport {
            failures: (1..=5).map(|i| format!("songs create failed: {}", i)).collect(),
            ..Default::default()
        };
        assert_eq!(
            report.summary(),
            "songs create failed: 1\nsongs create failed: 2\nsongs create failed: 3\n..."
        );
    }

    #[test]
    fn test_summary_without_truncation() {
        let report = ReconcileReport {
            failures: vec!["a".into(), "b".into()],
            ..Default::default()
        };
        assert_eq!(report.summary(), "a\nb");
        assert!(!report.is_success());
        assert!(ReconcileReport::default().is_success());
    }

    #[test]
    fn test_grouping_keeps_first_appearance_order() {
        let rows = vec![
            row(json!({"setlist_id": 2, "_isNew": true})),
            row(json!({"setlist_id": null, "_isNew": true})),
            row(json!({"setlist_id": 1, "_isNew": true})),
            row(json!({"setlist_id": "2", "_isNew": true})),
            row(json!({"_isNew": true})),
        ];

        let groups = group_by_setlist(&rows);
        let keys: Vec<Option<i64>> = groups.keys().cloned().collect();
        assert_eq!(keys, vec![Some(2), None, Some(1)]);
        assert_eq!(groups[&Some(2)].len(), 2);
        assert_eq!(groups[&None].len(), 2);
    }

    #[test]
    fn test_setlist_key_normalizes_numeric_forms() {
        assert_eq!(setlist_key(&json!(7)), Some(7));
        assert_eq!(setlist_key(&json!(7.0)), Some(7));
        assert_eq!(setlist_key(&json!(" 7 ")), Some(7));
        assert_eq!(setlist_key(&json!(7.5)), None);
        assert_eq!(setlist_key(&json!("")), None);
        assert_eq!(setlist_key(&Value::Null), None);
    }
}
