use crate::common::error::Result;
use crate::domain::{CellValue, RowFailure};
use async_trait::async_trait;

/// A group of positional inserts against one table. Every row shares the
/// batch's column list; values bind by position, never as literal text.
#[derive(Debug, Clone)]
pub struct InsertBatch {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

/// What happened to one batch: every row is attempted, failures are recorded
/// per row, and the survivors commit together.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub attempted: usize,
    pub inserted: usize,
    pub failures: Vec<RowFailure>,
}

/// The relational store capability. One implementation call covers one unit
/// of work: acquire the connection, attempt all rows, commit once, release.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Attempt every row independently; a row failure never prevents later
    /// rows, and rows that succeeded commit even when siblings failed.
    /// Errors only for connection-level problems.
    async fn insert_batch(&self, batch: InsertBatch) -> Result<BatchReport>;

    /// Create target tables when missing. Bootstrap only, not migrations.
    async fn ensure_schema(&self) -> Result<()>;

    /// Row count of one table, for summaries and tests.
    async fn table_count(&self, table: &str) -> Result<u64>;
}
