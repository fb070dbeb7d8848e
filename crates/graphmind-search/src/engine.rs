//! The search engine contract and its two implementations (spec.md §4.5).

use async_trait::async_trait;
use graphmind_core::entity::{Entity, Relation};
use graphmind_core::error::Result;

/// Exposes entity and relation search, with two interchangeable strategies.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Score and rank entities against `query_text`, descending, truncated to `k`.
    async fn search_entities(&self, query_text: &str, k: usize) -> Result<Vec<(Entity, f64)>>;

    /// Score `relations` against `query_text`, in the same descending contract.
    async fn score_relations(
        &self,
        query_text: &str,
        relations: &[Relation],
    ) -> Result<Vec<(Relation, f64)>>;

    /// Cosine similarity between `query_text` and `text`.
    async fn cosine_similarity(&self, query_text: &str, text: &str) -> Result<f64>;

    /// Cosine similarity between `query_text` and each of `texts`, in order.
    async fn cosine_similarities(&self, query_text: &str, texts: &[String]) -> Result<Vec<f64>>;

    /// Precompute any per-type helpers (schema load, etc). A no-op for [`crate::basic::BasicSearch`].
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }
}

/// Turn one store-returned row into an [`Entity`], if it carries the
/// minimum `id`/`name`/`entity_type` fields. Extra columns become
/// properties; this is the only place a raw [`graphmind_core::store::QueryRow`]
/// is trusted to describe an entity.
#[must_use]
pub fn row_to_entity(row: &graphmind_core::store::QueryRow) -> Option<Entity> {
    let id = row.get("id")?.as_str()?.to_string();
    let name = row.get("name")?.as_str()?.to_string();
    let entity_type = row
        .get("entity_type")
        .and_then(|v| v.as_str())
        .unwrap_or("Entity")
        .to_string();

    let mut entity = Entity::new(id, name, entity_type);
    for (key, value) in row {
        if matches!(key.as_str(), "id" | "name" | "entity_type") {
            continue;
        }
        entity = entity.with_property(key.clone(), value.clone());
    }
    Some(entity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn row_to_entity_requires_id_and_name() {
        let mut row = HashMap::new();
        row.insert("id".to_string(), json!("e1"));
        assert!(row_to_entity(&row).is_none());

        row.insert("name".to_string(), json!("Einstein"));
        let entity = row_to_entity(&row).unwrap();
        assert_eq!(entity.name, "Einstein");
        assert_eq!(entity.entity_type, "Entity");
    }

    #[test]
    fn row_to_entity_carries_extra_columns_as_properties() {
        let mut row = HashMap::new();
        row.insert("id".to_string(), json!("e1"));
        row.insert("name".to_string(), json!("Einstein"));
        row.insert("entity_type".to_string(), json!("Person"));
        row.insert("nationality".to_string(), json!("German"));
        let entity = row_to_entity(&row).unwrap();
        assert_eq!(entity.property_str("nationality"), Some("German"));
    }
}
