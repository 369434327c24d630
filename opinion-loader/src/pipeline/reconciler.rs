use std::collections::BTreeSet;
use std::sync::Arc;

use opinion_core::domain::{
    CellValue, EntityKind, EntityOutcome, ReconcileOutcome, RecordSet, SyntheticEntity,
};
use opinion_core::storage::{InsertBatch, Warehouse};
use tracing::{error, info, warn};

use crate::pipeline::manifest::Manifest;
use crate::pipeline::policy;
use crate::pipeline::reader::TabularReader;

/// Discovers every customer and product natural key referenced anywhere in
/// the entity-bearing fact extracts, synthesizes minimal entity rows, and
/// loads them ahead of any fact load that would otherwise dangle.
///
/// Scans raw extracts directly: reconciliation needs only the reference
/// columns and tolerates duplicates or nulls elsewhere in the row.
pub struct EntityReconciler<'a> {
    reader: &'a TabularReader,
    warehouse: Arc<dyn Warehouse>,
}

impl<'a> EntityReconciler<'a> {
    pub fn new(reader: &'a TabularReader, warehouse: Arc<dyn Warehouse>) -> Self {
        Self { reader, warehouse }
    }

    pub async fn run(&self, manifest: &Manifest) -> ReconcileOutcome {
        // BTreeSet: dedup by value across files, deterministic order for
        // reproducible runs.
        let mut customers: BTreeSet<String> = BTreeSet::new();
        let mut products: BTreeSet<String> = BTreeSet::new();

        for entry in manifest.entity_bearing() {
            let Some(refs) = policy::policy_for(&entry.table).and_then(|p| p.entity_refs)
            else {
                continue;
            };
            match self.reader.read(&entry.file, &entry.table) {
                Ok(set) => {
                    let before = (customers.len(), products.len());
                    collect_keys(refs.customer, &set, &mut customers);
                    collect_keys(refs.product, &set, &mut products);
                    info!(
                        "Analyzed {}: {} new customers, {} new products",
                        entry.file,
                        customers.len() - before.0,
                        products.len() - before.1
                    );
                }
                Err(e) => {
                    // A missing entity-bearing file skips its contribution,
                    // same as the file-level skip in the main loop.
                    warn!("Entity scan skipped {}: {}", entry.file, e);
                }
            }
        }

        let mut outcome = ReconcileOutcome::default();
        for (kind, keys) in [
            (EntityKind::Customer, customers),
            (EntityKind::Product, products),
        ] {
            let batch = InsertBatch {
                table: kind.table().to_string(),
                columns: kind.columns(),
                rows: keys
                    .iter()
                    .map(|k| SyntheticEntity::for_key(kind, k).into_row())
                    .collect(),
            };
            match self.warehouse.insert_batch(batch).await {
                Ok(report) => {
                    info!(
                        "Reconciled {} {}s: {} inserted, {} failed",
                        keys.len(),
                        kind,
                        report.inserted,
                        report.failures.len()
                    );
                    outcome.entities.push(EntityOutcome {
                        kind,
                        discovered: keys.len(),
                        inserted: report.inserted,
                        failures: report.failures,
                    });
                }
                Err(e) => {
                    error!("Reconciliation pass for {} failed: {}", kind, e);
                    outcome.error = Some(e.to_string());
                    return outcome;
                }
            }
        }
        outcome.committed = true;
        outcome
    }
}

fn collect_keys(column: Option<&str>, set: &RecordSet, keys: &mut BTreeSet<String>) {
    let Some(column) = column else { return };
    let Some(index) = set.columns.iter().position(|c| c == column) else {
        warn!(
            "Reference column {} missing from {}",
            column, set.source_file
        );
        return;
    };
    for record in &set.records {
        if let Some(key) = record.values.get(index).and_then(CellValue::render) {
            keys.insert(key);
        }
    }
}
