//! Schema inspection with time-windowed caching and single-flight rebuild
//! (spec.md §4.3, component C3).
//!
//! An `Arc<RwLock<_>>` snapshot refreshed on a schedule, with a separate
//! lock coalescing concurrent rebuild requests into one in-flight
//! computation.

use graphmind_core::error::Result;
use graphmind_core::schema::{GraphSchema, RelationPattern};
use graphmind_core::store::GraphStore;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, info, warn};

struct Cached {
    schema: Arc<GraphSchema>,
    built_at: Instant,
}

enum RebuildState {
    Idle,
    InFlight(broadcast::Sender<Arc<GraphSchema>>),
}

/// Builds and caches a [`GraphSchema`] from a [`GraphStore`].
///
/// A schema is considered valid for `ttl` after it was built. Expiry
/// triggers a rebuild; concurrent callers observing the same expiry
/// coalesce onto one rebuild rather than each querying the store.
pub struct SchemaInspector {
    store: Arc<dyn GraphStore>,
    cache: RwLock<Option<Cached>>,
    rebuild_state: Mutex<RebuildState>,
    ttl: Duration,
    sample_size: usize,
}

impl SchemaInspector {
    /// Create an inspector over `store` with the given cache time-to-live.
    #[must_use]
    pub fn new(store: Arc<dyn GraphStore>, ttl: Duration) -> Self {
        Self {
            store,
            cache: RwLock::new(None),
            rebuild_state: Mutex::new(RebuildState::Idle),
            ttl,
            sample_size: 5,
        }
    }

    /// Return the cached schema if still valid, otherwise rebuild it.
    ///
    /// # Errors
    /// Only surfaces an error if the store fails in a way the inspector
    /// cannot degrade past; label/type enumeration failures are handled by
    /// falling back to [`GraphSchema::degenerate`].
    pub async fn schema(&self) -> Result<Arc<GraphSchema>> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            if cached.built_at.elapsed() < self.ttl {
                return Ok(Arc::clone(&cached.schema));
            }
        }
        self.rebuild().await
    }

    /// Force a rebuild, coalescing concurrent callers onto a single
    /// in-flight computation.
    ///
    /// # Errors
    /// Propagates a store error only when `build` itself cannot be reached
    /// at all; enumeration failures degrade to [`GraphSchema::degenerate`].
    pub async fn rebuild(&self) -> Result<Arc<GraphSchema>> {
        let mut rx = {
            let mut state = self.rebuild_state.lock().await;
            match &*state {
                RebuildState::InFlight(tx) => Some(tx.subscribe()),
                RebuildState::Idle => {
                    let (tx, _rx) = broadcast::channel(1);
                    *state = RebuildState::InFlight(tx);
                    None
                }
            }
        };

        if let Some(rx) = rx.take() {
            let mut rx = rx;
            return rx.recv().await.map_err(|_| {
                graphmind_core::error::GraphMindError::Internal(
                    "schema rebuild task was dropped".to_string(),
                )
            });
        }

        let schema = Arc::new(self.build().await);
        self.cache.write().await.replace(Cached {
            schema: Arc::clone(&schema),
            built_at: Instant::now(),
        });

        let mut state = self.rebuild_state.lock().await;
        if let RebuildState::InFlight(tx) = std::mem::replace(&mut *state, RebuildState::Idle) {
            let _ = tx.send(Arc::clone(&schema));
        }

        Ok(schema)
    }

    async fn build(&self) -> GraphSchema {
        let node_labels = match self.store.all_node_types().await {
            Ok(labels) => labels,
            Err(e) => {
                warn!(error = %e, "node type enumeration failed, falling back to degenerate schema");
                return GraphSchema::degenerate();
            }
        };
        let relation_types = match self.store.all_relationship_types().await {
            Ok(types) => types,
            Err(e) => {
                warn!(error = %e, "relationship type enumeration failed, falling back to degenerate schema");
                return GraphSchema::degenerate();
            }
        };

        let mut node_types = Vec::with_capacity(node_labels.len());
        for label in &node_labels {
            let count = self.store.node_count(label).await.unwrap_or(0);
            let mut properties = self
                .store
                .analyze_node_properties(label)
                .await
                .unwrap_or_default();
            for property in &mut properties {
                if let Ok(samples) = self
                    .store
                    .sample_property_values(label, &property.name, self.sample_size)
                    .await
                {
                    property.samples = samples;
                }
            }
            node_types.push(graphmind_core::schema::NodeTypeInfo {
                label: label.clone(),
                approximate_count: count,
                properties: properties.into_iter().map(|p| (p.name.clone(), p)).collect(),
            });
        }

        let relation_patterns = self.relation_patterns().await;

        let mut relationship_types = Vec::with_capacity(relation_types.len());
        for relation_type in &relation_types {
            let count = self
                .store
                .relationship_count(relation_type)
                .await
                .unwrap_or(0);
            let properties = self
                .store
                .analyze_relationship_properties(relation_type)
                .await
                .unwrap_or_default();
            relationship_types.push(graphmind_core::schema::RelationshipTypeInfo {
                relation_type: relation_type.clone(),
                total_count: count,
                patterns: relation_patterns.get(relation_type).cloned().unwrap_or_default(),
                properties: properties.into_iter().map(|p| (p.name.clone(), p)).collect(),
            });
        }

        info!(
            node_types = node_types.len(),
            relationship_types = relationship_types.len(),
            "schema rebuilt"
        );

        GraphSchema {
            node_types,
            relationship_types,
            index_suggestions: Vec::new(),
            stop_words: graphmind_core::schema::default_stop_words(),
            relation_weights: Vec::new(),
            extraction_patterns: Vec::new(),
        }
    }

    /// Derive `(source_label, target_label, count)` triples per relation
    /// type by walking every entity's outgoing relations. Each relation is
    /// counted once, from its source side, against an id-to-label map built
    /// from [`GraphStore::list_entities`].
    async fn relation_patterns(&self) -> HashMap<String, Vec<RelationPattern>> {
        let entities = self.store.list_entities().await.unwrap_or_default();
        let labels: HashMap<&str, &str> = entities
            .iter()
            .map(|e| (e.id.as_str(), e.entity_type.as_str()))
            .collect();

        let mut counts: HashMap<(String, String, String), u64> = HashMap::new();
        for entity in &entities {
            let relations = self.store.entity_relations(&entity.id).await.unwrap_or_default();
            for relation in relations.iter().filter(|r| r.source_id == entity.id) {
                let Some(&target_label) = labels.get(relation.target_id.as_str()) else {
                    continue;
                };
                *counts
                    .entry((
                        relation.relation_type.clone(),
                        entity.entity_type.clone(),
                        target_label.to_string(),
                    ))
                    .or_insert(0) += 1;
            }
        }

        let mut by_relation_type: HashMap<String, Vec<RelationPattern>> = HashMap::new();
        for ((relation_type, source_label, target_label), count) in counts {
            by_relation_type
                .entry(relation_type)
                .or_default()
                .push((source_label, target_label, count));
        }
        for patterns in by_relation_type.values_mut() {
            patterns.sort_unstable();
        }
        by_relation_type
    }

    /// Invalidate the cache unconditionally; the next [`Self::schema`] call rebuilds.
    pub async fn invalidate(&self) {
        debug!("schema cache invalidated");
        self.cache.write().await.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphmind_core::entity::Entity;
    use graphmind_core::memory_store::InMemoryGraphStore;

    #[tokio::test]
    async fn builds_schema_from_store_labels() {
        let store = InMemoryGraphStore::new();
        store.add_entity(Entity::new("e1", "Einstein", "Person")).await;
        let store: Arc<dyn GraphStore> = Arc::new(store);
        let inspector = SchemaInspector::new(store, Duration::from_secs(60));

        let schema = inspector.schema().await.unwrap();
        assert_eq!(schema.node_types.len(), 1);
        assert_eq!(schema.node_types[0].label, "Person");
    }

    #[tokio::test]
    async fn falls_back_to_degenerate_on_enumeration_failure() {
        let store: Arc<dyn GraphStore> = Arc::new(InMemoryGraphStore::rejecting_enumeration());
        let inspector = SchemaInspector::new(store, Duration::from_secs(60));

        let schema = inspector.schema().await.unwrap();
        assert_eq!(schema.node_types.len(), 1);
        assert_eq!(schema.node_types[0].label, "Entity");
    }

    #[tokio::test]
    async fn build_computes_relation_patterns_and_samples_properties() {
        let store = InMemoryGraphStore::new();
        store.add_entity(Entity::new("e1", "Einstein", "Person")).await;
        store
            .add_entity(
                Entity::new("e2", "Relativity", "Theory")
                    .with_property("year", serde_json::json!(1915)),
            )
            .await;
        store
            .add_relation(graphmind_core::entity::Relation::new("e1", "e2", "DEVELOPED"))
            .await;
        let store: Arc<dyn GraphStore> = Arc::new(store);
        let inspector = SchemaInspector::new(store, Duration::from_secs(60));

        let schema = inspector.schema().await.unwrap();
        let relation = schema.relationship_type("DEVELOPED").unwrap();
        assert!(relation.patterns_sum_to_total());
        assert_eq!(relation.patterns, vec![("Person".to_string(), "Theory".to_string(), 1)]);

        let theory = schema.node_type("Theory").unwrap();
        assert_eq!(theory.properties["year"].samples, vec!["1915".to_string()]);
    }

    #[tokio::test]
    async fn concurrent_rebuilds_coalesce() {
        let store: Arc<dyn GraphStore> = Arc::new(InMemoryGraphStore::new());
        let inspector = Arc::new(SchemaInspector::new(store, Duration::from_millis(0)));

        let a = inspector.clone();
        let b = inspector.clone();
        let (ra, rb) = tokio::join!(
            tokio::spawn(async move { a.rebuild().await }),
            tokio::spawn(async move { b.rebuild().await })
        );
        assert!(ra.unwrap().is_ok());
        assert!(rb.unwrap().is_ok());
    }
}
