use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use opinion_core::domain::{EntryStatus, LoadOutcome, RunSummary};
use opinion_core::storage::Warehouse;
use tracing::{info, warn};

use crate::common::error::{EtlError, Result};
use crate::config::LoaderConfig;
use crate::pipeline::cleaner;
use crate::pipeline::manifest::{Manifest, ManifestEntry};
use crate::pipeline::policy;
use crate::pipeline::reader::TabularReader;
use crate::pipeline::reconciler::EntityReconciler;
use crate::pipeline::table_loader::TableLoader;

/// Cooperative cancellation signal, checked between units of work. Cancelling
/// abandons uncommitted work only; units already committed stay committed.
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Sequences entity reconciliation ahead of the manifest-driven load loop and
/// aggregates per-file outcomes into a run summary. No signal from a single
/// entry ever aborts the remaining entries.
pub struct PipelineOrchestrator {
    reader: TabularReader,
    warehouse: Arc<dyn Warehouse>,
    loader: TableLoader,
    manifest: Manifest,
    cancel: CancelFlag,
    entry_timeout: Option<Duration>,
}

impl PipelineOrchestrator {
    pub fn new(config: &LoaderConfig, warehouse: Arc<dyn Warehouse>) -> Self {
        Self {
            reader: TabularReader::new(config.data_dir.clone()),
            loader: TableLoader::new(warehouse.clone()),
            warehouse,
            manifest: Manifest::default_layout(),
            cancel: CancelFlag::new(),
            entry_timeout: config.entry_timeout(),
        }
    }

    pub fn with_manifest(mut self, manifest: Manifest) -> Self {
        self.manifest = manifest;
        self
    }

    /// Handle for cancelling the run from another task.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Run the full pipeline. Errors only when the store cannot be brought up
    /// at all; every later problem is contained in the summary.
    pub async fn run(&self) -> Result<RunSummary> {
        let mut summary = RunSummary::new();
        info!("🚀 Starting load run {}", summary.run_id);

        self.warehouse.ensure_schema().await?;

        // Barrier: entity rows must be durably committed before any fact
        // table referencing them is attempted.
        let reconciler = EntityReconciler::new(&self.reader, self.warehouse.clone());
        summary.reconciliation = reconciler.run(&self.manifest).await;
        if !summary.reconciliation.committed {
            warn!("Reconciliation did not commit; entity-referencing loads will not be attempted");
        }

        for entry in self.manifest.ordered() {
            if self.cancel.is_cancelled() {
                warn!("Run cancelled; {} not attempted", entry.file);
                summary
                    .entries
                    .push(LoadOutcome::cancelled(&entry.file, &entry.table));
                continue;
            }
            if !summary.reconciliation.committed && references_entities(&entry.table) {
                warn!(
                    "❌ {} not attempted: entity reconciliation did not commit",
                    entry.file
                );
                summary.entries.push(LoadOutcome::failed(
                    &entry.file,
                    &entry.table,
                    0,
                    0,
                    "entity reconciliation did not commit".to_string(),
                ));
                continue;
            }
            let outcome = match self.entry_timeout {
                Some(limit) => {
                    match tokio::time::timeout(limit, self.process_entry(entry)).await {
                        Ok(outcome) => outcome,
                        Err(_) => LoadOutcome::failed(
                            &entry.file,
                            &entry.table,
                            0,
                            0,
                            format!("timed out after {}s", limit.as_secs()),
                        ),
                    }
                }
                None => self.process_entry(entry).await,
            };
            summary.entries.push(outcome);
        }

        summary.finished_at = Some(Utc::now());
        log_summary(&summary);
        Ok(summary)
    }

    /// State machine per entry:
    /// Read -> Cleaned -> {Empty: Skipped | Filtered -> Inserted -> Committed}.
    /// Never returns an error; every failure mode becomes an outcome.
    async fn process_entry(&self, entry: &ManifestEntry) -> LoadOutcome {
        info!("📂 Processing {} -> {}", entry.file, entry.table);

        let set = match self.reader.read(&entry.file, &entry.table) {
            Ok(set) => set,
            Err(e) => {
                warn!("❌ {} skipped: {}", entry.file, e);
                return LoadOutcome::skipped_read(&entry.file, &entry.table, e.to_string());
            }
        };
        let rows_read = set.records.len();

        let mut cleaned = match cleaner::clean(set) {
            Ok(cleaned) => cleaned,
            Err(EtlError::EmptyAfterCleaning { .. }) => {
                warn!("⚠️  No rows survived cleaning for {}", entry.file);
                return LoadOutcome::skipped_empty(&entry.file, &entry.table, rows_read);
            }
            Err(e) => {
                return LoadOutcome::failed(&entry.file, &entry.table, rows_read, 0, e.to_string())
            }
        };

        policy::apply_exclusions(&mut cleaned);
        let rows_cleaned = cleaned.rows_cleaned();

        match self.loader.load(cleaned).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("❌ Load of {} failed: {}", entry.file, e);
                LoadOutcome::failed(
                    &entry.file,
                    &entry.table,
                    rows_read,
                    rows_cleaned,
                    e.to_string(),
                )
            }
        }
    }
}

/// Whether loads into this table depend on reconciled entity rows.
fn references_entities(table: &str) -> bool {
    policy::policy_for(table).map_or(false, |p| p.depends_on_entities)
}

fn log_summary(summary: &RunSummary) {
    for entity in &summary.reconciliation.entities {
        info!(
            "Entities ({}): {} discovered, {} inserted",
            entity.kind, entity.discovered, entity.inserted
        );
    }
    for entry in &summary.entries {
        match entry.status {
            EntryStatus::Committed => info!(
                "{} -> {}: read {}, cleaned {}, inserted {}/{} ({} row failures)",
                entry.source_file,
                entry.table,
                entry.rows_read,
                entry.rows_cleaned,
                entry.rows_inserted,
                entry.rows_attempted,
                entry.failures.len()
            ),
            _ => warn!(
                "{} -> {}: {:?}{}",
                entry.source_file,
                entry.table,
                entry.status,
                entry
                    .error
                    .as_deref()
                    .map(|e| format!(" ({e})"))
                    .unwrap_or_default()
            ),
        }
    }
    info!(
        "🎉 Run {} finished: {} rows inserted, {} row failures across {} entries",
        summary.run_id,
        summary.total_inserted(),
        summary.total_row_failures(),
        summary.entries.len()
    );
}
