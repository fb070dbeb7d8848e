//! `EntitySearchAgent`: wraps C5's candidate retrieval and the §4.5 match
//! cascade (spec.md §4.11).

use crate::coordinator::{Agent, AgentResult, AgentState};
use async_trait::async_trait;
use graphmind_core::entity::Entity;
use graphmind_core::store::GraphStore;
use graphmind_providers::embedding::{cosine, EmbeddingProvider};
use graphmind_search::cascade::cascade_score;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

const DEFAULT_K: usize = 10;
const DEFAULT_SEMANTIC_THRESHOLD: f64 = 0.5;

/// Handles `entity_search`, `entity_identification`, and `semantic_search`.
pub struct EntitySearchAgent<S, E> {
    id: String,
    store: Arc<S>,
    embeddings: Arc<E>,
}

impl<S: GraphStore, E: EmbeddingProvider> EntitySearchAgent<S, E> {
    #[must_use]
    pub fn new(id: impl Into<String>, store: Arc<S>, embeddings: Arc<E>) -> Self {
        Self {
            id: id.into(),
            store,
            embeddings,
        }
    }

    async fn candidate_entities(&self) -> Vec<Entity> {
        self.store.list_entities().await.unwrap_or_default()
    }

    fn k_from(context: &HashMap<String, Value>) -> usize {
        context
            .get("k")
            .and_then(Value::as_u64)
            .map_or(DEFAULT_K, |v| v as usize)
    }

    async fn search(&self, description: &str, k: usize) -> Vec<(Entity, f64)> {
        let candidates = self.candidate_entities().await;
        cascade_score(&candidates, description, k)
    }

    /// Tokenize on whitespace/punctuation, search per token, and dedup by id
    /// keeping the maximum score across tokens.
    async fn identify(&self, description: &str, k: usize) -> Vec<(Entity, f64)> {
        let candidates = self.candidate_entities().await;
        let tokens: Vec<&str> = description
            .split(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
            .filter(|t| !t.is_empty())
            .collect();

        let mut best: HashMap<String, (Entity, f64)> = HashMap::new();
        for token in tokens {
            for (entity, score) in cascade_score(&candidates, token, k) {
                best.entry(entity.id.clone())
                    .and_modify(|(_, existing)| {
                        if score > *existing {
                            *existing = score;
                        }
                    })
                    .or_insert((entity, score));
            }
        }
        let mut out: Vec<(Entity, f64)> = best.into_values().collect();
        out.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        out.truncate(k);
        out
    }

    async fn semantic_search(
        &self,
        description: &str,
        k: usize,
        threshold: f64,
    ) -> Result<Vec<(Entity, f64)>, graphmind_core::error::GraphMindError> {
        let candidates = self.candidate_entities().await;
        let mut texts = vec![description.to_string()];
        texts.extend(candidates.iter().map(|e| e.name.clone()));
        let vectors = self.embeddings.embed(&texts).await?;
        let query_vector = &vectors[0];

        let mut scored: Vec<(Entity, f64)> = candidates
            .into_iter()
            .zip(vectors[1..].iter())
            .map(|(entity, vector)| (entity, cosine(query_vector, vector)))
            .filter(|(_, score)| *score >= threshold)
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}

fn summarize(matches: &[(Entity, f64)]) -> (String, HashMap<String, Value>) {
    let result = matches
        .iter()
        .map(|(e, score)| format!("{} ({:.2})", e.name, score))
        .collect::<Vec<_>>()
        .join(", ");
    let mut metadata = HashMap::new();
    metadata.insert(
        "matches".to_string(),
        Value::Array(
            matches
                .iter()
                .map(|(e, score)| {
                    serde_json::json!({"id": e.id, "name": e.name, "score": score})
                })
                .collect(),
        ),
    );
    metadata.insert("count".to_string(), Value::from(matches.len()));
    (result, metadata)
}

#[async_trait]
impl<S: GraphStore, E: EmbeddingProvider> Agent for EntitySearchAgent<S, E> {
    fn id(&self) -> &str {
        &self.id
    }

    fn state(&self) -> AgentState {
        AgentState::Ready
    }

    fn can_handle(&self, kind: &str, _description: &str) -> bool {
        matches!(kind, "entity_search" | "entity_identification" | "semantic_search")
    }

    async fn execute(
        &self,
        kind: &str,
        description: &str,
        context: &HashMap<String, Value>,
    ) -> AgentResult {
        let k = Self::k_from(context);
        match kind {
            "entity_search" => {
                let matches = self.search(description, k).await;
                let (result, metadata) = summarize(&matches);
                AgentResult::success(result, metadata)
            }
            "entity_identification" => {
                let matches = self.identify(description, k).await;
                let (result, metadata) = summarize(&matches);
                AgentResult::success(result, metadata)
            }
            "semantic_search" => {
                let threshold = context
                    .get("threshold")
                    .and_then(Value::as_f64)
                    .unwrap_or(DEFAULT_SEMANTIC_THRESHOLD);
                match self.semantic_search(description, k, threshold).await {
                    Ok(matches) => {
                        let (result, metadata) = summarize(&matches);
                        AgentResult::success(result, metadata)
                    }
                    Err(e) => AgentResult::failure(e.to_string()),
                }
            }
            other => AgentResult::failure(format!("unsupported kind for EntitySearchAgent: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphmind_core::error::Result;
    use graphmind_core::schema::PropertyInfo;
    use graphmind_core::store::QueryRow;
    use graphmind_providers::stub::StubEmbeddingProvider;

    /// A minimal [`GraphStore`] whose `list_entities` answers from a fixed
    /// set, so these tests don't depend on
    /// [`graphmind_core::memory_store::InMemoryGraphStore`]'s entity layout.
    struct ListEntitiesStore {
        entities: Vec<Entity>,
    }

    #[async_trait]
    impl GraphStore for ListEntitiesStore {
        async fn find_entity(&self, _id: &str) -> Result<Option<Entity>> {
            Ok(None)
        }
        async fn entity_relations(&self, _id: &str) -> Result<Vec<graphmind_core::entity::Relation>> {
            Ok(Vec::new())
        }
        async fn list_entities(&self) -> Result<Vec<Entity>> {
            Ok(self.entities.clone())
        }
        async fn execute_parameterized_query(
            &self,
            _query_text: &str,
            _parameters: HashMap<String, Value>,
        ) -> Result<Vec<QueryRow>> {
            Ok(Vec::new())
        }
        async fn all_node_types(&self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
        async fn all_relationship_types(&self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
        async fn node_count(&self, _label: &str) -> Result<u64> {
            Ok(0)
        }
        async fn relationship_count(&self, _relation_type: &str) -> Result<u64> {
            Ok(0)
        }
        async fn total_node_count(&self) -> Result<u64> {
            Ok(0)
        }
        async fn total_relationship_count(&self) -> Result<u64> {
            Ok(0)
        }
        async fn analyze_node_properties(&self, _label: &str) -> Result<Vec<PropertyInfo>> {
            Ok(Vec::new())
        }
        async fn analyze_relationship_properties(&self, _relation_type: &str) -> Result<Vec<PropertyInfo>> {
            Ok(Vec::new())
        }
        async fn sample_property_values(&self, _label: &str, _property: &str, _n: usize) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
        async fn database_type(&self) -> Result<String> {
            Ok("test".to_string())
        }
        async fn version(&self) -> Result<String> {
            Ok("0".to_string())
        }
    }

    fn store_with(entities: &[(&str, &str, &str)]) -> Arc<ListEntitiesStore> {
        let entities = entities
            .iter()
            .map(|(id, name, entity_type)| Entity::new(*id, *name, *entity_type))
            .collect();
        Arc::new(ListEntitiesStore { entities })
    }

    #[tokio::test]
    async fn entity_search_finds_exact_match() {
        let store = store_with(&[("1", "Einstein", "Person"), ("2", "Plato", "Person")]);
        let agent = EntitySearchAgent::new("es1", store, Arc::new(StubEmbeddingProvider::new(4)));
        let result = agent.execute("entity_search", "Einstein", &HashMap::new()).await;
        assert!(result.success);
        assert!(result.result.contains("Einstein"));
    }

    #[tokio::test]
    async fn entity_identification_dedups_across_tokens() {
        let store = store_with(&[("1", "Albert Einstein", "Person")]);
        let agent = EntitySearchAgent::new("es1", store, Arc::new(StubEmbeddingProvider::new(4)));
        let result = agent
            .execute("entity_identification", "Albert Einstein physicist", &HashMap::new())
            .await;
        assert!(result.success);
        assert_eq!(result.metadata.get("count").and_then(Value::as_u64), Some(1));
    }

    #[tokio::test]
    async fn unsupported_kind_fails() {
        let store = store_with(&[]);
        let agent = EntitySearchAgent::new("es1", store, Arc::new(StubEmbeddingProvider::new(4)));
        let result = agent.execute("path_finding", "x", &HashMap::new()).await;
        assert!(!result.success);
    }
}
