//! An in-memory [`GraphStore`] used by unit tests and the seed end-to-end
//! scenarios: a couple of `RwLock<HashMap<...>>`s behind an `Arc`-free
//! struct (the store itself is cheap to construct per test; callers wrap
//! it in `Arc` when sharing across a session).

use crate::entity::{Entity, Relation};
use crate::error::{GraphMindError, Result};
use crate::schema::{PropertyInfo, PropertyValueKind};
use crate::store::{GraphStore, QueryRow};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// A handcrafted, in-process graph store for tests.
#[derive(Debug, Default)]
pub struct InMemoryGraphStore {
    entities: RwLock<HashMap<String, Entity>>,
    relations: RwLock<Vec<Relation>>,
    /// When true, every enumeration call fails with `Store` — used to
    /// exercise the schema-fallback scenario (spec.md §8 scenario 6).
    reject_enumeration: bool,
}

impl InMemoryGraphStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that fails every label/type enumeration call, forcing
    /// the schema inspector to fall back to [`crate::schema::GraphSchema::degenerate`].
    #[must_use]
    pub fn rejecting_enumeration() -> Self {
        Self {
            reject_enumeration: true,
            ..Self::default()
        }
    }

    /// Insert an entity, returning its id.
    pub async fn add_entity(&self, entity: Entity) -> String {
        let id = entity.id.clone();
        self.entities.write().await.insert(id.clone(), entity);
        id
    }

    /// Insert a relation between two already-inserted entities.
    pub async fn add_relation(&self, relation: Relation) {
        self.relations.write().await.push(relation);
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn find_entity(&self, id: &str) -> Result<Option<Entity>> {
        Ok(self.entities.read().await.get(id).cloned())
    }

    async fn entity_relations(&self, id: &str) -> Result<Vec<Relation>> {
        Ok(self
            .relations
            .read()
            .await
            .iter()
            .filter(|r| r.source_id == id || r.target_id == id)
            .cloned()
            .collect())
    }

    async fn list_entities(&self) -> Result<Vec<Entity>> {
        Ok(self.entities.read().await.values().cloned().collect())
    }

    async fn execute_parameterized_query(
        &self,
        _query_text: &str,
        _parameters: HashMap<String, Value>,
    ) -> Result<Vec<QueryRow>> {
        Ok(Vec::new())
    }

    async fn all_node_types(&self) -> Result<Vec<String>> {
        if self.reject_enumeration {
            return Err(GraphMindError::Store("label enumeration unsupported".into()));
        }
        let entities = self.entities.read().await;
        let mut labels: Vec<String> = entities.values().map(|e| e.entity_type.clone()).collect();
        labels.sort_unstable();
        labels.dedup();
        Ok(labels)
    }

    async fn all_relationship_types(&self) -> Result<Vec<String>> {
        if self.reject_enumeration {
            return Err(GraphMindError::Store("type enumeration unsupported".into()));
        }
        let relations = self.relations.read().await;
        let mut types: Vec<String> = relations.iter().map(|r| r.relation_type.clone()).collect();
        types.sort_unstable();
        types.dedup();
        Ok(types)
    }

    async fn node_count(&self, label: &str) -> Result<u64> {
        let entities = self.entities.read().await;
        Ok(entities.values().filter(|e| e.entity_type == label).count() as u64)
    }

    async fn relationship_count(&self, relation_type: &str) -> Result<u64> {
        let relations = self.relations.read().await;
        Ok(relations
            .iter()
            .filter(|r| r.relation_type == relation_type)
            .count() as u64)
    }

    async fn total_node_count(&self) -> Result<u64> {
        Ok(self.entities.read().await.len() as u64)
    }

    async fn total_relationship_count(&self) -> Result<u64> {
        Ok(self.relations.read().await.len() as u64)
    }

    async fn analyze_node_properties(&self, label: &str) -> Result<Vec<PropertyInfo>> {
        let entities = self.entities.read().await;
        let matching: Vec<&Entity> = entities.values().filter(|e| e.entity_type == label).collect();
        if matching.is_empty() {
            return Ok(Vec::new());
        }
        let mut by_name: HashMap<String, Vec<String>> = HashMap::new();
        for e in &matching {
            for (k, v) in &e.properties {
                by_name.entry(k.clone()).or_default().push(value_to_sample(v));
            }
        }
        let total = matching.len() as f64;
        Ok(by_name
            .into_iter()
            .map(|(name, samples)| {
                let frequency = samples.len() as f64 / total;
                PropertyInfo {
                    name,
                    frequency,
                    value_kind: PropertyValueKind::String,
                    samples: samples.into_iter().take(5).collect(),
                }
            })
            .collect())
    }

    async fn analyze_relationship_properties(&self, relation_type: &str) -> Result<Vec<PropertyInfo>> {
        let relations = self.relations.read().await;
        let matching: Vec<&Relation> = relations
            .iter()
            .filter(|r| r.relation_type == relation_type)
            .collect();
        if matching.is_empty() {
            return Ok(Vec::new());
        }
        let mut by_name: HashMap<String, Vec<String>> = HashMap::new();
        for r in &matching {
            for (k, v) in &r.properties {
                by_name.entry(k.clone()).or_default().push(value_to_sample(v));
            }
        }
        let total = matching.len() as f64;
        Ok(by_name
            .into_iter()
            .map(|(name, samples)| {
                let frequency = samples.len() as f64 / total;
                PropertyInfo {
                    name,
                    frequency,
                    value_kind: PropertyValueKind::String,
                    samples: samples.into_iter().take(5).collect(),
                }
            })
            .collect())
    }

    async fn sample_property_values(&self, label: &str, property: &str, n: usize) -> Result<Vec<String>> {
        let entities = self.entities.read().await;
        Ok(entities
            .values()
            .filter(|e| e.entity_type == label)
            .filter_map(|e| e.properties.get(property).map(value_to_sample))
            .take(n)
            .collect())
    }

    async fn database_type(&self) -> Result<String> {
        Ok("in-memory".to_string())
    }

    async fn version(&self) -> Result<String> {
        Ok(env!("CARGO_PKG_VERSION").to_string())
    }
}

fn value_to_sample(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
