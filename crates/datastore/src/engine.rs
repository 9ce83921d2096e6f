//! In-process hierarchical entity store
//!
//! Stands in for the remote datastore behind the hierarchical adapter,
//! exposing the semantic surface the adapter programs against: put and
//! delete by full key path, batch get, native queries with filter, sort,
//! and offset+limit push-down, exact counts, and entity-group optimistic
//! transactions.
//!
//! ## Transaction model
//!
//! A transaction observes the version of every entity group at begin
//! time. Commit validates that the groups touched by its mutations have
//! not moved since, applies all mutations atomically under the write
//! lock, and bumps the touched groups' versions. A version mismatch is a
//! concurrent-modification conflict; the caller may refresh the observed
//! versions and retry.

use crate::entity::{Entity, EntityKey, PropertyValue};
use parking_lot::RwLock;
use polystore_core::{FilterOp, SortDirection};
use std::cmp::Ordering;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

/// Engine-native error type
#[derive(Debug, Error)]
pub enum EngineError {
    /// Entity group moved between transaction begin and commit
    #[error("concurrent modification of entity group '{group}'")]
    Conflict {
        /// Kind/name of the conflicted group root
        group: String,
    },

    /// Filter or sort compared two different property types
    #[error("property '{property}': cannot compare {expected} with {actual}")]
    Comparison {
        /// Property under comparison
        property: String,
        /// Stored type
        expected: &'static str,
        /// Compared type
        actual: &'static str,
    },

    /// Ordering requested on a type without an order (blob)
    #[error("property '{property}' has no ordering")]
    NotOrdered {
        /// Offending property
        property: String,
    },
}

impl From<EngineError> for polystore_core::RepositoryError {
    fn from(e: EngineError) -> Self {
        use polystore_core::RepositoryError;
        match e {
            EngineError::Comparison {
                property,
                expected,
                actual,
            } => RepositoryError::FilterTypeMismatch {
                property,
                expected,
                actual,
            },
            EngineError::NotOrdered { property } => RepositoryError::Unsupported(format!(
                "ordering comparison on blob property '{property}'"
            )),
            conflict @ EngineError::Conflict { .. } => {
                RepositoryError::Backend(conflict.to_string())
            }
        }
    }
}

/// One native filter term, already in engine value space
#[derive(Debug, Clone)]
pub struct PropertyFilter {
    /// Property name
    pub property: String,
    /// Comparison operator
    pub op: FilterOp,
    /// Comparison value
    pub value: PropertyValue,
}

/// Native query descriptor with full push-down
#[derive(Debug, Clone)]
pub struct EngineQuery {
    /// Kind to scan
    pub kind: String,
    /// AND-combined filters
    pub filters: Vec<PropertyFilter>,
    /// Sort keys in precedence order
    pub sorts: Vec<(String, SortDirection)>,
    /// Records to skip after sorting
    pub offset: Option<usize>,
    /// Maximum records to return
    pub limit: Option<usize>,
}

impl EngineQuery {
    /// Unfiltered scan of one kind
    pub fn scan(kind: impl Into<String>) -> Self {
        EngineQuery {
            kind: kind.into(),
            filters: Vec::new(),
            sorts: Vec::new(),
            offset: None,
            limit: None,
        }
    }
}

/// A native transaction handle: observed group versions at begin
#[derive(Debug)]
pub struct EngineTransaction {
    observed: HashMap<EntityKey, u64>,
}

/// A mutation applied at commit
#[derive(Debug, Clone)]
pub enum Mutation {
    /// Insert or overwrite an entity
    Put(Entity),
    /// Delete by full key path (absent keys are a no-op)
    Delete(EntityKey),
}

impl Mutation {
    fn key(&self) -> &EntityKey {
        match self {
            Mutation::Put(e) => &e.key,
            Mutation::Delete(k) => k,
        }
    }
}

#[derive(Default)]
struct EngineState {
    entities: HashMap<EntityKey, Entity>,
    group_versions: HashMap<EntityKey, u64>,
}

/// The store itself; cheap to share behind `Arc`
#[derive(Default)]
pub struct DatastoreEngine {
    state: RwLock<EngineState>,
}

impl DatastoreEngine {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a transaction, observing current group versions
    pub fn begin(&self) -> EngineTransaction {
        EngineTransaction {
            observed: self.state.read().group_versions.clone(),
        }
    }

    /// Re-observe group versions after a conflict, for a retry
    pub fn refresh(&self, txn: &mut EngineTransaction) {
        txn.observed = self.state.read().group_versions.clone();
    }

    /// Validate and apply a transaction's mutations atomically
    pub fn commit(
        &self,
        txn: &EngineTransaction,
        mutations: &[Mutation],
    ) -> Result<(), EngineError> {
        let mut state = self.state.write();

        // Validate every touched group against the observed versions.
        for m in mutations {
            let root = m.key().group_root().clone();
            let current = state.group_versions.get(&root).copied().unwrap_or(0);
            let observed = txn.observed.get(&root).copied().unwrap_or(0);
            if current != observed {
                warn!(
                    group = %format!("{}/{}", root.kind, root.name),
                    observed,
                    current,
                    "entity group moved since transaction begin"
                );
                return Err(EngineError::Conflict {
                    group: format!("{}/{}", root.kind, root.name),
                });
            }
        }

        for m in mutations {
            let root = m.key().group_root().clone();
            *state.group_versions.entry(root).or_insert(0) += 1;
            match m {
                Mutation::Put(entity) => {
                    state.entities.insert(entity.key.clone(), entity.clone());
                }
                Mutation::Delete(key) => {
                    if state.entities.remove(key).is_none() {
                        debug!(kind = %key.kind, name = %key.name, "delete of absent entity");
                    }
                }
            }
        }
        Ok(())
    }

    /// Point lookup by full key path
    pub fn get(&self, key: &EntityKey) -> Option<Entity> {
        self.state.read().entities.get(key).cloned()
    }

    /// Batch lookup; absent keys are skipped
    pub fn get_many(&self, keys: &[EntityKey]) -> Vec<Entity> {
        let state = self.state.read();
        keys.iter()
            .filter_map(|k| state.entities.get(k).cloned())
            .collect()
    }

    /// Existence check by full key path
    pub fn contains(&self, key: &EntityKey) -> bool {
        self.state.read().entities.contains_key(key)
    }

    /// Run a query with native filter/sort/offset+limit evaluation
    pub fn run_query(&self, query: &EngineQuery) -> Result<Vec<Entity>, EngineError> {
        let mut matches = self.matching_entities(&query.kind, &query.filters)?;
        sort_entities(&mut matches, &query.sorts)?;

        let start = query.offset.unwrap_or(0).min(matches.len());
        let end = match query.limit {
            Some(limit) => (start + limit).min(matches.len()),
            None => matches.len(),
        };
        Ok(matches[start..end].to_vec())
    }

    /// Exact count of entities matching the filters
    pub fn count_matching(
        &self,
        kind: &str,
        filters: &[PropertyFilter],
    ) -> Result<u64, EngineError> {
        Ok(self.matching_entities(kind, filters)?.len() as u64)
    }

    fn matching_entities(
        &self,
        kind: &str,
        filters: &[PropertyFilter],
    ) -> Result<Vec<Entity>, EngineError> {
        let state = self.state.read();
        let mut out = Vec::new();
        'entity: for entity in state.entities.values() {
            if entity.key.kind != kind {
                continue;
            }
            for f in filters {
                // A filter on an absent property never matches.
                let Some(stored) = entity.properties.get(&f.property) else {
                    continue 'entity;
                };
                if !stored.matches(&f.property, f.op, &f.value)? {
                    continue 'entity;
                }
            }
            out.push(entity.clone());
        }
        // Deterministic base order before explicit sorts are applied.
        out.sort_by(|a, b| a.key.name.cmp(&b.key.name));
        Ok(out)
    }
}

/// Stable multi-key sort; earlier keys take precedence
///
/// Entities missing a sort property order after those that have it,
/// regardless of direction. Sort type mismatches are detected in a
/// validation pre-pass so the comparator itself is infallible.
fn sort_entities(
    entities: &mut [Entity],
    sorts: &[(String, SortDirection)],
) -> Result<(), EngineError> {
    if sorts.is_empty() {
        return Ok(());
    }

    for (prop, _) in sorts {
        let mut expected: Option<&'static str> = None;
        for e in entities.iter() {
            if let Some(v) = e.properties.get(prop) {
                if matches!(v, PropertyValue::Blob(_)) {
                    return Err(EngineError::NotOrdered {
                        property: prop.clone(),
                    });
                }
                let name = sort_type_name(v);
                match expected {
                    None => expected = Some(name),
                    Some(exp) if exp != name => {
                        return Err(EngineError::Comparison {
                            property: prop.clone(),
                            expected: exp,
                            actual: name,
                        })
                    }
                    _ => {}
                }
            }
        }
    }

    entities.sort_by(|a, b| {
        for (prop, dir) in sorts {
            let ord = match (a.properties.get(prop), b.properties.get(prop)) {
                (Some(x), Some(y)) => {
                    let ord = x.compare(prop, y).unwrap_or(Ordering::Equal);
                    match dir {
                        SortDirection::Ascending => ord,
                        SortDirection::Descending => ord.reverse(),
                    }
                }
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
    Ok(())
}

/// Type bucket for sort validation; Str and Text sort together
fn sort_type_name(v: &PropertyValue) -> &'static str {
    match v {
        PropertyValue::Str(_) | PropertyValue::Text(_) => "string",
        other => other.type_name(),
    }
}
