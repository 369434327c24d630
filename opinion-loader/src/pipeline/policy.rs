use std::collections::HashMap;

use once_cell::sync::Lazy;
use opinion_core::domain::CleanedRecordSet;
use tracing::debug;

/// Which columns of an entity-bearing fact table reference which entity type.
#[derive(Debug, Clone, Copy)]
pub struct EntityRefs {
    pub customer: Option<&'static str>,
    pub product: Option<&'static str>,
}

/// Per-table load policy: columns the store generates itself (never supplied
/// by the loader), whether the table's rows carry foreign keys into the
/// entity tables, and, for the extracts scanned by reconciliation, the entity
/// reference columns.
#[derive(Debug, Clone, Copy)]
pub struct TablePolicy {
    pub excluded: &'static [&'static str],
    pub depends_on_entities: bool,
    pub entity_refs: Option<EntityRefs>,
}

static POLICIES: Lazy<HashMap<&'static str, TablePolicy>> = Lazy::new(|| {
    HashMap::from([
        (
            "Comentarios_Sociales",
            TablePolicy {
                excluded: &["IdComment"],
                depends_on_entities: true,
                entity_refs: Some(EntityRefs {
                    customer: Some("IdCliente"),
                    product: Some("IdProducto"),
                }),
            },
        ),
        (
            "Review",
            TablePolicy {
                excluded: &["IdReview"],
                depends_on_entities: true,
                entity_refs: Some(EntityRefs {
                    customer: Some("IdCliente"),
                    product: Some("IdProducto"),
                }),
            },
        ),
        (
            "Encuestas",
            TablePolicy {
                excluded: &["IdOpinion"],
                depends_on_entities: true,
                entity_refs: None,
            },
        ),
        (
            "Fuente_De_Datos",
            TablePolicy {
                excluded: &["IdFuente"],
                depends_on_entities: false,
                entity_refs: None,
            },
        ),
    ])
});

pub fn policy_for(table: &str) -> Option<&'static TablePolicy> {
    POLICIES.get(table)
}

/// Drop the table's identity columns from a cleaned set, preserving the order
/// of the remaining columns. Excluded columns that are absent are fine; the
/// exclusion set is optional per table, not mandatory.
pub fn apply_exclusions(set: &mut CleanedRecordSet) {
    let Some(policy) = policy_for(&set.table) else {
        return;
    };
    let mut drop_indices: Vec<usize> = set
        .columns
        .iter()
        .enumerate()
        .filter(|(_, c)| policy.excluded.contains(&c.as_str()))
        .map(|(i, _)| i)
        .collect();
    if drop_indices.is_empty() {
        return;
    }

    debug!(
        "Excluding identity columns from {}: {:?}",
        set.table,
        drop_indices
            .iter()
            .map(|&i| set.columns[i].as_str())
            .collect::<Vec<_>>()
    );

    drop_indices.reverse();
    for &index in &drop_indices {
        set.columns.remove(index);
        for record in &mut set.records {
            if index < record.values.len() {
                record.values.remove(index);
            }
        }
    }
}
