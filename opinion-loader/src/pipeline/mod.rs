// Pipeline components, leaf-first: reader, cleaner, policy, reconciler,
// table loader, orchestrator.

pub mod cleaner;
pub mod manifest;
pub mod orchestrator;
pub mod policy;
pub mod reader;
pub mod reconciler;
pub mod table_loader;

pub use manifest::{Manifest, ManifestEntry};
pub use orchestrator::{CancelFlag, PipelineOrchestrator};
pub use reader::TabularReader;
pub use reconciler::EntityReconciler;
pub use table_loader::TableLoader;
