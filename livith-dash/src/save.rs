//! Save workflow
//!
//! Runs the [`BatchReconciler`] on a change-set and handles the outcome:
//! - any failed row: the change-set is kept in the draft store for a retry
//! - full success: the draft is cleared and every table is reloaded

use indexmap::IndexMap;
use livith_common::Table;
use serde::Serialize;
use tracing::{info, warn};

use crate::draft::DraftStore;
use crate::error::DashResult;
use crate::reconcile::{BatchReconciler, ReconcileReport};
use crate::records::{list_table, ListParams};
use crate::row::ChangeSet;
use crate::store::{Record, RecordStore};

/// Result of a save
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SaveOutcome {
    /// Every row applied; draft cleared, first page of every table reloaded
    Saved {
        report: ReconcileReport,
        reloaded: IndexMap<Table, Vec<Record>>,
    },
    /// Some rows failed; the change-set stays in the draft store
    Partial { report: ReconcileReport },
}

impl SaveOutcome {
    pub fn report(&self) -> &ReconcileReport {
        match self {
            SaveOutcome::Saved { report, .. } | SaveOutcome::Partial { report } => report,
        }
    }
}

/// Apply `changes` and settle the draft
pub async fn save_changes(
    store: &dyn RecordStore,
    drafts: &dyn DraftStore,
    changes: &ChangeSet,
) -> DashResult<SaveOutcome> {
    let report = BatchReconciler::new(store).run(changes).await;

    if !report.is_success() {
        warn!(
            "Save incomplete, keeping draft ({} failures)",
            report.failures.len()
        );
        drafts.save(changes).await?;
        return Ok(SaveOutcome::Partial { report });
    }

    drafts.clear().await?;

    let mut reloaded = IndexMap::new();
    for table in Table::ALL {
        let page = list_table(store, table, &ListParams::default()).await?;
        reloaded.insert(table, page.rows);
    }

    info!(
        "Save complete: {} created, {} updated",
        report.created, report.updated
    );
    Ok(SaveOutcome::Saved { report, reloaded })
}
