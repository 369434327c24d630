use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use opinion_core::domain::{EntryStatus, RunSummary};
use opinion_core::storage::{SqliteWarehouse, Warehouse};
use opinion_loader::config::LoaderConfig;
use opinion_loader::observability::logging::init_logging;
use opinion_loader::pipeline::{cleaner, policy, Manifest, PipelineOrchestrator, TabularReader};

#[derive(Parser)]
#[command(name = "opinion-loader")]
#[command(about = "Batch CSV loader for the customer opinion analysis warehouse")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile entities and load every manifest entry into the warehouse
    Run {
        /// Directory holding the CSV extracts
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// SQLite database file
        #[arg(long)]
        database: Option<PathBuf>,
    },
    /// Read, clean, and filter every manifest entry without writing anything
    Check {
        /// Directory holding the CSV extracts
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    let mut config = LoaderConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { data_dir, database } => {
            if let Some(dir) = data_dir {
                config.data_dir = dir;
            }
            if let Some(db) = database {
                config.database_path = db;
            }
            let warehouse: Arc<dyn Warehouse> =
                Arc::new(SqliteWarehouse::open(&config.database_path)?);
            let orchestrator = PipelineOrchestrator::new(&config, warehouse);
            let summary = orchestrator.run().await?;
            print_summary(&summary);
        }
        Commands::Check { data_dir } => {
            if let Some(dir) = data_dir {
                config.data_dir = dir;
            }
            run_check(&config);
        }
    }

    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("🎉 Load run {} completed", summary.run_id);
    for entity in &summary.reconciliation.entities {
        println!(
            "   {}s: {} discovered, {} inserted",
            entity.kind, entity.discovered, entity.inserted
        );
    }
    for entry in &summary.entries {
        let status = match entry.status {
            EntryStatus::Committed => "committed",
            EntryStatus::SkippedEmpty => "skipped (empty after cleaning)",
            EntryStatus::SkippedRead => "skipped (source unavailable)",
            EntryStatus::Cancelled => "cancelled",
            EntryStatus::Failed => "failed",
        };
        println!(
            "   {} -> {}: {} | read {}, cleaned {}, inserted {}/{}",
            entry.source_file,
            entry.table,
            status,
            entry.rows_read,
            entry.rows_cleaned,
            entry.rows_inserted,
            entry.rows_attempted
        );
        for failure in &entry.failures {
            println!("      row {}: {}", failure.row_index, failure.cause);
        }
    }
    println!(
        "   Totals: {} rows inserted, {} row failures",
        summary.total_inserted(),
        summary.total_row_failures()
    );
}

/// Dry run: the read -> clean -> filter front half of the pipeline, with
/// counts per file and no database writes.
fn run_check(config: &LoaderConfig) {
    let reader = TabularReader::new(config.data_dir.clone());
    let manifest = Manifest::default_layout();

    println!("🔍 Checking extracts under {}", config.data_dir.display());
    for entry in manifest.ordered() {
        match reader.read(&entry.file, &entry.table) {
            Ok(set) => {
                let rows_read = set.records.len();
                match cleaner::clean(set) {
                    Ok(mut cleaned) => {
                        policy::apply_exclusions(&mut cleaned);
                        println!(
                            "   {} -> {}: {} rows read, {} clean, {} columns to load",
                            entry.file,
                            entry.table,
                            rows_read,
                            cleaned.records.len(),
                            cleaned.columns.len()
                        );
                    }
                    Err(_) => println!(
                        "   {} -> {}: {} rows read, none survive cleaning",
                        entry.file, entry.table, rows_read
                    ),
                }
            }
            Err(e) => println!("   {} -> {}: unavailable ({e})", entry.file, entry.table),
        }
    }
}
