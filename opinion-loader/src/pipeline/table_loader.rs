use std::sync::Arc;

use opinion_core::domain::{CleanedRecordSet, EntryStatus, LoadOutcome};
use opinion_core::storage::{InsertBatch, Warehouse};
use tracing::info;

use crate::common::error::Result;

/// Turns a cleaned, policy-filtered record set into one positional insert per
/// row. Row failures are isolated; the file's survivors commit together.
pub struct TableLoader {
    warehouse: Arc<dyn Warehouse>,
}

impl TableLoader {
    pub fn new(warehouse: Arc<dyn Warehouse>) -> Self {
        Self { warehouse }
    }

    /// Errors only for connection-level problems; row-level failures come
    /// back inside the outcome.
    pub async fn load(&self, set: CleanedRecordSet) -> Result<LoadOutcome> {
        let source_file = set.source_file;
        let table = set.table;
        let rows_read = set.rows_read;
        let rows_cleaned = set.records.len();

        let batch = InsertBatch {
            table: table.clone(),
            columns: set.columns,
            rows: set.records.into_iter().map(|r| r.values).collect(),
        };

        let report = self.warehouse.insert_batch(batch).await?;
        info!(
            "✅ {}: {}/{} rows inserted from {}",
            table, report.inserted, report.attempted, source_file
        );

        Ok(LoadOutcome {
            source_file,
            table,
            status: EntryStatus::Committed,
            rows_read,
            rows_cleaned,
            rows_attempted: report.attempted,
            rows_inserted: report.inserted,
            failures: report.failures,
            error: None,
        })
    }
}
