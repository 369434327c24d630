use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use opinion_core::domain::{CleanedRecordSet, RecordSet};
use tracing::debug;

use crate::common::error::{EtlError, Result};

/// Canonical column renames for headers carrying diacritics. Applying the map
/// twice is a no-op since no canonical name is itself a key.
static CANONICAL_RENAMES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("Categoría", "Categoria"),
        ("Clasificación", "Clasificacion"),
        ("PuntajeSatisfacción", "PuntajeSatisfaccion"),
    ])
});

pub fn canonical_name(name: &str) -> &str {
    CANONICAL_RENAMES.get(name).copied().unwrap_or(name)
}

/// Deduplicate exact-duplicate records, drop records with any null field,
/// rename columns to canonical form. Signals `EmptyAfterCleaning` when no
/// record survives; the caller must skip the load but still report the file.
pub fn clean(set: RecordSet) -> Result<CleanedRecordSet> {
    let rows_read = set.records.len();

    let mut seen = HashSet::new();
    let mut records = Vec::new();
    for record in set.records {
        if record.has_null() {
            continue;
        }
        // Field-for-field fingerprint; later duplicates of an earlier record
        // are discarded.
        let fingerprint = serde_json::to_string(&record.values)
            .map_err(|e| EtlError::Config(format!("cannot fingerprint record: {e}")))?;
        if seen.insert(fingerprint) {
            records.push(record);
        }
    }

    debug!(
        "Cleaned {}: {} rows in, {} rows out",
        set.source_file,
        rows_read,
        records.len()
    );

    if records.is_empty() {
        return Err(EtlError::EmptyAfterCleaning {
            file: set.source_file,
        });
    }

    let columns = set
        .columns
        .iter()
        .map(|c| canonical_name(c).to_string())
        .collect();

    Ok(CleanedRecordSet {
        source_file: set.source_file,
        table: set.table,
        columns,
        records,
        rows_read,
    })
}
