use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One cell of a source extract. `Null` covers both missing fields and empty
/// unquoted CSV cells; numeric-looking text is parsed so scores and amounts
/// bind as numbers rather than strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Real(f64),
    Null,
}

impl CellValue {
    /// Interpret one raw CSV field.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CellValue::Null;
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return CellValue::Integer(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            return CellValue::Real(f);
        }
        CellValue::Text(trimmed.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Text rendering of a non-null cell, used for natural-key extraction.
    pub fn render(&self) -> Option<String> {
        match self {
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Integer(i) => Some(i.to_string()),
            CellValue::Real(f) => Some(f.to_string()),
            CellValue::Null => None,
        }
    }
}

/// One row of one source extract. Values are positional and parallel to the
/// owning set's `columns`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub values: Vec<CellValue>,
}

impl RawRecord {
    pub fn new(values: Vec<CellValue>) -> Self {
        Self { values }
    }

    pub fn has_null(&self) -> bool {
        self.values.iter().any(CellValue::is_null)
    }
}

/// An ordered set of records sharing one header, tagged with its source file
/// and target table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordSet {
    pub source_file: String,
    pub table: String,
    pub columns: Vec<String>,
    pub records: Vec<RawRecord>,
}

/// A `RecordSet` after deduplication, null-row removal, and canonical column
/// renaming. Carries the pre-cleaning row count for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanedRecordSet {
    pub source_file: String,
    pub table: String,
    pub columns: Vec<String>,
    pub records: Vec<RawRecord>,
    pub rows_read: usize,
}

impl CleanedRecordSet {
    pub fn rows_cleaned(&self) -> usize {
        self.records.len()
    }
}

/// The two entity types discovered from fact extracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Customer,
    Product,
}

impl EntityKind {
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Customer => "Cliente",
            EntityKind::Product => "Producto",
        }
    }

    /// Column order used when materializing synthetic entities.
    pub fn columns(&self) -> Vec<String> {
        let cols: [&str; 3] = match self {
            EntityKind::Customer => ["IdCliente", "Nombre", "Email"],
            EntityKind::Product => ["IdProducto", "Nombre", "Categoria"],
        };
        cols.iter().map(|c| c.to_string()).collect()
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Customer => write!(f, "customer"),
            EntityKind::Product => write!(f, "product"),
        }
    }
}

/// A minimal entity record synthesized from a natural key alone, never from
/// authoritative data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticEntity {
    pub kind: EntityKind,
    pub natural_key: String,
    pub display_name: String,
    pub detail: String,
}

impl SyntheticEntity {
    pub fn customer(key: &str) -> Self {
        Self {
            kind: EntityKind::Customer,
            natural_key: key.to_string(),
            display_name: format!("Cliente_{key}"),
            detail: format!("{}@mail.com", key.to_lowercase()),
        }
    }

    pub fn product(key: &str) -> Self {
        Self {
            kind: EntityKind::Product,
            natural_key: key.to_string(),
            display_name: format!("Producto_{key}"),
            detail: "General".to_string(),
        }
    }

    pub fn for_key(kind: EntityKind, key: &str) -> Self {
        match kind {
            EntityKind::Customer => Self::customer(key),
            EntityKind::Product => Self::product(key),
        }
    }

    /// Row shape matching `EntityKind::columns`.
    pub fn into_row(self) -> Vec<CellValue> {
        vec![
            CellValue::Text(self.natural_key),
            CellValue::Text(self.display_name),
            CellValue::Text(self.detail),
        ]
    }
}

/// One row that failed to insert. `row_index` is 0-based within the attempted
/// batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowFailure {
    pub row_index: usize,
    pub cause: String,
}

/// Terminal state of one manifest entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryStatus {
    Committed,
    SkippedEmpty,
    SkippedRead,
    Cancelled,
    Failed,
}

/// Per-file load report: counts at every pipeline stage plus row-level
/// failures and, for skipped or failed entries, the entry-level cause.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadOutcome {
    pub source_file: String,
    pub table: String,
    pub status: EntryStatus,
    pub rows_read: usize,
    pub rows_cleaned: usize,
    pub rows_attempted: usize,
    pub rows_inserted: usize,
    pub failures: Vec<RowFailure>,
    pub error: Option<String>,
}

impl LoadOutcome {
    pub fn skipped_read(source_file: &str, table: &str, cause: String) -> Self {
        Self {
            source_file: source_file.to_string(),
            table: table.to_string(),
            status: EntryStatus::SkippedRead,
            rows_read: 0,
            rows_cleaned: 0,
            rows_attempted: 0,
            rows_inserted: 0,
            failures: Vec::new(),
            error: Some(cause),
        }
    }

    pub fn skipped_empty(source_file: &str, table: &str, rows_read: usize) -> Self {
        Self {
            source_file: source_file.to_string(),
            table: table.to_string(),
            status: EntryStatus::SkippedEmpty,
            rows_read,
            rows_cleaned: 0,
            rows_attempted: 0,
            rows_inserted: 0,
            failures: Vec::new(),
            error: None,
        }
    }

    pub fn cancelled(source_file: &str, table: &str) -> Self {
        Self {
            source_file: source_file.to_string(),
            table: table.to_string(),
            status: EntryStatus::Cancelled,
            rows_read: 0,
            rows_cleaned: 0,
            rows_attempted: 0,
            rows_inserted: 0,
            failures: Vec::new(),
            error: None,
        }
    }

    pub fn failed(
        source_file: &str,
        table: &str,
        rows_read: usize,
        rows_cleaned: usize,
        cause: String,
    ) -> Self {
        Self {
            source_file: source_file.to_string(),
            table: table.to_string(),
            status: EntryStatus::Failed,
            rows_read,
            rows_cleaned,
            rows_attempted: 0,
            rows_inserted: 0,
            failures: Vec::new(),
            error: Some(cause),
        }
    }
}

/// Per-entity-type reconciliation counts. `inserted <= discovered` always;
/// `discovered` is the cardinality of the key union across all entity-bearing
/// extracts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityOutcome {
    pub kind: EntityKind,
    pub discovered: usize,
    pub inserted: usize,
    pub failures: Vec<RowFailure>,
}

/// Result of the reconciliation pass that runs ahead of every fact load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    pub entities: Vec<EntityOutcome>,
    pub committed: bool,
    pub error: Option<String>,
}

impl ReconcileOutcome {
    pub fn discovered(&self, kind: EntityKind) -> usize {
        self.entities
            .iter()
            .find(|e| e.kind == kind)
            .map_or(0, |e| e.discovered)
    }

    pub fn inserted(&self, kind: EntityKind) -> usize {
        self.entities
            .iter()
            .find(|e| e.kind == kind)
            .map_or(0, |e| e.inserted)
    }
}

/// Aggregate report for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub reconciliation: ReconcileOutcome,
    pub entries: Vec<LoadOutcome>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            reconciliation: ReconcileOutcome::default(),
            entries: Vec::new(),
        }
    }

    pub fn total_inserted(&self) -> usize {
        self.entries.iter().map(|e| e.rows_inserted).sum()
    }

    pub fn total_row_failures(&self) -> usize {
        self.entries.iter().map(|e| e.failures.len()).sum()
    }
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_parse_empty_is_null() {
        assert_eq!(CellValue::parse(""), CellValue::Null);
        assert_eq!(CellValue::parse("   "), CellValue::Null);
    }

    #[test]
    fn test_cell_parse_numbers() {
        assert_eq!(CellValue::parse("42"), CellValue::Integer(42));
        assert_eq!(CellValue::parse("4.5"), CellValue::Real(4.5));
        assert_eq!(CellValue::parse("C0001"), CellValue::Text("C0001".to_string()));
    }

    #[test]
    fn test_synthetic_customer_shape() {
        let entity = SyntheticEntity::customer("C0001");
        assert_eq!(entity.display_name, "Cliente_C0001");
        assert_eq!(entity.detail, "c0001@mail.com");
        let row = entity.into_row();
        assert_eq!(row.len(), EntityKind::Customer.columns().len());
    }

    #[test]
    fn test_synthetic_product_category_is_general() {
        let entity = SyntheticEntity::product("P1");
        assert_eq!(entity.display_name, "Producto_P1");
        assert_eq!(entity.detail, "General");
    }
}
