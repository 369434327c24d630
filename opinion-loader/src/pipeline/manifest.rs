use opinion_core::domain::EntityKind;
use serde::{Deserialize, Serialize};

use crate::pipeline::policy;

/// One (source file, target table) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub file: String,
    pub table: String,
}

impl ManifestEntry {
    pub fn new(file: &str, table: &str) -> Self {
        Self {
            file: file.to_string(),
            table: table.to_string(),
        }
    }
}

/// The ordered declaration of which source feeds which target, fixed at
/// pipeline-build time. Iteration order is computed from the dependency
/// structure rather than trusted from the declaration order.
#[derive(Debug, Clone)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new(entries: Vec<ManifestEntry>) -> Self {
        Self { entries }
    }

    /// The reference layout of the analysis warehouse feeds.
    pub fn default_layout() -> Self {
        Self::new(vec![
            ManifestEntry::new("clients.csv", "Cliente"),
            ManifestEntry::new("products.csv", "Producto"),
            ManifestEntry::new("fuente_datos.csv", "Fuente_De_Datos"),
            ManifestEntry::new("surveys_part1.csv", "Encuestas"),
            ManifestEntry::new("social_comments.csv", "Comentarios_Sociales"),
            ManifestEntry::new("web_reviews.csv", "Review"),
        ])
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Entries whose target table carries entity reference columns; the
    /// reconciler scans these files ahead of every load.
    pub fn entity_bearing(&self) -> Vec<&ManifestEntry> {
        self.entries
            .iter()
            .filter(|e| {
                policy::policy_for(&e.table)
                    .map_or(false, |p| p.entity_refs.is_some())
            })
            .collect()
    }

    /// Entries in dependency order: entity tables first, then tables without
    /// entity references, then fact tables that reference entities. Within a
    /// rank the declaration order is kept.
    pub fn ordered(&self) -> Vec<&ManifestEntry> {
        let mut ordered: Vec<&ManifestEntry> = self.entries.iter().collect();
        ordered.sort_by_key(|e| Self::dependency_rank(&e.table));
        ordered
    }

    fn dependency_rank(table: &str) -> u8 {
        if table == EntityKind::Customer.table() || table == EntityKind::Product.table() {
            return 0;
        }
        match policy::policy_for(table) {
            Some(p) if p.depends_on_entities => 2,
            _ => 1,
        }
    }
}

impl Default for Manifest {
    fn default() -> Self {
        Self::default_layout()
    }
}
