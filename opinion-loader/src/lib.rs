//! Batch loader for the customer opinion analysis warehouse.
//!
//! Ingests independently produced CSV extracts (surveys, social comments,
//! web reviews, reference data), reconciles customer/product identities
//! scattered across them, and loads everything into the relational store
//! with best-effort per-row semantics.

pub mod common;
pub mod config;
pub mod observability;
pub mod pipeline;

pub use config::LoaderConfig;
pub use pipeline::manifest::{Manifest, ManifestEntry};
pub use pipeline::orchestrator::{CancelFlag, PipelineOrchestrator};
pub use pipeline::reader::TabularReader;
