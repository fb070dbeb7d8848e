//! The graph store adapter contract (spec.md §4.1, component C1).
//!
//! This is the only capability the core consumes from the underlying graph
//! database. It never constructs queries from user input; the escape hatch
//! `execute_parameterized_query` is reserved for the schema inspector and a
//! store's own initializer (spec.md §4.1) — the search layer and agents
//! enumerate entities through the first-class `list_entities` operation
//! instead.

use crate::entity::{Entity, Relation};
use crate::error::Result;
use crate::schema::PropertyInfo;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// One row returned by [`GraphStore::execute_parameterized_query`].
pub type QueryRow = HashMap<String, Value>;

/// The read-only graph store contract consumed by the reasoning core.
///
/// Implementations must be safe to share across concurrent sessions
/// (`Send + Sync`): the core never mutates graph data and treats every
/// call as idempotent.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Look up an entity by id.
    async fn find_entity(&self, id: &str) -> Result<Option<Entity>>;

    /// All relations incident to `id`, in either direction. Order is
    /// unspecified but stable within a session.
    async fn entity_relations(&self, id: &str) -> Result<Vec<Relation>>;

    /// Enumerate every entity in the store. The search layer's candidate
    /// generation (spec.md §4.5) and the entity-search agent (spec.md §4.11)
    /// both read the whole entity set through this operation rather than
    /// the `execute_parameterized_query` escape hatch.
    async fn list_entities(&self) -> Result<Vec<Entity>>;

    /// Escape hatch for the schema inspector and a store's own initializer:
    /// run a parameterized query and get back rows. Never fed user input
    /// directly.
    async fn execute_parameterized_query(
        &self,
        query_text: &str,
        parameters: HashMap<String, Value>,
    ) -> Result<Vec<QueryRow>>;

    /// All distinct node labels in the graph.
    async fn all_node_types(&self) -> Result<Vec<String>>;

    /// All distinct relationship type strings in the graph.
    async fn all_relationship_types(&self) -> Result<Vec<String>>;

    /// Approximate count of nodes carrying `label`.
    async fn node_count(&self, label: &str) -> Result<u64>;

    /// Approximate count of relations of type `relation_type`.
    async fn relationship_count(&self, relation_type: &str) -> Result<u64>;

    /// Total node count across all labels.
    async fn total_node_count(&self) -> Result<u64>;

    /// Total relationship count across all types.
    async fn total_relationship_count(&self) -> Result<u64>;

    /// Property frequency/sample profile for every property observed on `label`.
    async fn analyze_node_properties(&self, label: &str) -> Result<Vec<PropertyInfo>>;

    /// Property frequency/sample profile for every property observed on `relation_type`.
    async fn analyze_relationship_properties(&self, relation_type: &str) -> Result<Vec<PropertyInfo>>;

    /// Up to `n` sample string values for `property` on nodes labeled `label`.
    async fn sample_property_values(&self, label: &str, property: &str, n: usize) -> Result<Vec<String>>;

    /// Backend identifier, for diagnostics.
    async fn database_type(&self) -> Result<String>;

    /// Backend version string, for diagnostics.
    async fn version(&self) -> Result<String>;
}
