use std::path::PathBuf;

use opinion_core::domain::{CellValue, RawRecord, RecordSet};
use tracing::debug;

use crate::common::error::{EtlError, Result};

/// Loads one source file into an ordered record set. A missing or unreadable
/// file surfaces as `SourceUnavailable`, which callers treat as "skip this
/// file, continue pipeline".
pub struct TabularReader {
    data_dir: PathBuf,
}

impl TabularReader {
    pub fn new<P: Into<PathBuf>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn read(&self, file: &str, table: &str) -> Result<RecordSet> {
        let path = self.data_dir.join(file);
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&path)
            .map_err(|e| EtlError::SourceUnavailable {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        let columns: Vec<String> = reader
            .headers()
            .map_err(|e| EtlError::SourceUnavailable {
                path: path.clone(),
                reason: format!("cannot read header: {e}"),
            })?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            // Short rows pad with nulls; surplus fields beyond the header are
            // dropped.
            let values = (0..columns.len())
                .map(|i| row.get(i).map_or(CellValue::Null, CellValue::parse))
                .collect();
            records.push(RawRecord::new(values));
        }

        debug!(
            "Read {} rows x {} columns from {}",
            records.len(),
            columns.len(),
            path.display()
        );

        Ok(RecordSet {
            source_file: file.to_string(),
            table: table.to_string(),
            columns,
            records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(dir: &std::path::Path, name: &str, content: &str) {
        let mut f = std::fs::File::create(dir.join(name)).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn test_missing_file_is_source_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let reader = TabularReader::new(dir.path());
        let err = reader.read("nope.csv", "Cliente").unwrap_err();
        assert!(matches!(err, EtlError::SourceUnavailable { .. }));
    }

    #[test]
    fn test_column_order_preserved() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(dir.path(), "r.csv", "Zeta,Alpha,Mid\n1,2,3\n");
        let reader = TabularReader::new(dir.path());
        let set = reader.read("r.csv", "Review").unwrap();
        assert_eq!(set.columns, vec!["Zeta", "Alpha", "Mid"]);
        assert_eq!(set.records[0].values[0], CellValue::Integer(1));
    }

    #[test]
    fn test_empty_cell_reads_as_null() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(dir.path(), "n.csv", "A,B\nx,\n");
        let reader = TabularReader::new(dir.path());
        let set = reader.read("n.csv", "Review").unwrap();
        assert_eq!(set.records[0].values[1], CellValue::Null);
    }

    #[test]
    fn test_short_row_pads_with_null() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(dir.path(), "s.csv", "A,B,C\n1,2\n");
        let reader = TabularReader::new(dir.path());
        let set = reader.read("s.csv", "Review").unwrap();
        assert_eq!(set.records[0].values.len(), 3);
        assert_eq!(set.records[0].values[2], CellValue::Null);
    }
}
