//! Schema-guided search (spec.md §4.5, "Schema-guided"): consult the
//! schema inspector's [`SearchStrategy`] to pick candidate node types and
//! properties first, then run the prioritized match cascade from
//! [`crate::cascade`] only over that narrowed candidate set.

use crate::cascade::cascade_score;
use crate::engine::SearchEngine;
use async_trait::async_trait;
use graphmind_core::entity::{Entity, Relation};
use graphmind_core::error::Result;
use graphmind_core::schema::SearchStrategy;
use graphmind_core::store::GraphStore;
use graphmind_providers::embedding::{cosine, EmbeddingProvider};
use graphmind_schema::inspector::SchemaInspector;
use std::sync::Arc;
use tracing::debug;

/// Default node/relation effectiveness thresholds (spec.md §4.3: 0.3 / 0.2).
const NODE_EFFECTIVENESS_THRESHOLD: f64 = 0.3;
const RELATION_EFFECTIVENESS_THRESHOLD: f64 = 0.2;

pub struct SchemaGuidedSearch<S, E> {
    store: Arc<S>,
    embeddings: Arc<E>,
    inspector: Arc<SchemaInspector>,
}

impl<S: GraphStore, E: EmbeddingProvider> SchemaGuidedSearch<S, E> {
    #[must_use]
    pub fn new(store: Arc<S>, embeddings: Arc<E>, inspector: Arc<SchemaInspector>) -> Self {
        Self {
            store,
            embeddings,
            inspector,
        }
    }

    /// Split `text` into lowercase alphanumeric keyword tokens — the same
    /// schema-driven tokenization the strategy derivation expects (no
    /// baked-in language-specific regex, per SPEC_FULL.md's Open Questions).
    fn keywords(text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect()
    }

    async fn candidate_entities(&self) -> Result<Vec<Entity>> {
        self.store.list_entities().await
    }

    /// Narrow the full candidate set to the node types the strategy judged
    /// relevant, falling back to the full set when the strategy named none
    /// or the effectiveness threshold wasn't cleared.
    fn narrow(&self, candidates: Vec<Entity>, strategy: &SearchStrategy) -> Vec<Entity> {
        if !strategy.is_effective(NODE_EFFECTIVENESS_THRESHOLD, RELATION_EFFECTIVENESS_THRESHOLD) {
            debug!("search strategy ineffective, falling back to full candidate scan");
            return candidates;
        }
        let relevant_types: std::collections::HashSet<&str> = strategy
            .node_type_scores
            .iter()
            .map(|(t, _)| t.as_str())
            .collect();
        candidates
            .into_iter()
            .filter(|e| relevant_types.contains(e.entity_type.as_str()))
            .collect()
    }
}

#[async_trait]
impl<S: GraphStore, E: EmbeddingProvider> SearchEngine for SchemaGuidedSearch<S, E> {
    async fn search_entities(&self, query_text: &str, k: usize) -> Result<Vec<(Entity, f64)>> {
        let schema = self.inspector.schema().await?;
        let keywords = Self::keywords(query_text);
        let strategy = graphmind_schema::strategy::derive_strategy(&schema, &keywords);

        let candidates = self.candidate_entities().await?;
        let narrowed = self.narrow(candidates, &strategy);
        Ok(cascade_score(&narrowed, query_text, k))
    }

    async fn score_relations(
        &self,
        query_text: &str,
        relations: &[Relation],
    ) -> Result<Vec<(Relation, f64)>> {
        let schema = self.inspector.schema().await?;
        let mut scored = Vec::with_capacity(relations.len());
        for relation in relations {
            let lower_query = query_text.to_lowercase();
            let lower_type = relation.relation_type.to_lowercase();
            let mut score = if lower_type == lower_query {
                1.0
            } else if lower_type.contains(&lower_query) || lower_query.contains(&lower_type) {
                0.7
            } else {
                self.cosine_similarity(query_text, &relation.relation_type)
                    .await?
            };
            score *= schema.relation_weight(&relation.relation_type);
            scored.push((relation.clone(), score.clamp(0.0, 1.0)));
        }
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored)
    }

    async fn cosine_similarity(&self, query_text: &str, text: &str) -> Result<f64> {
        let vectors = self
            .embeddings
            .embed(&[query_text.to_string(), text.to_string()])
            .await?;
        Ok(cosine(&vectors[0], &vectors[1]))
    }

    async fn cosine_similarities(&self, query_text: &str, texts: &[String]) -> Result<Vec<f64>> {
        let mut all = vec![query_text.to_string()];
        all.extend_from_slice(texts);
        let vectors = self.embeddings.embed(&all).await?;
        let query_vector = &vectors[0];
        Ok(vectors[1..].iter().map(|v| cosine(query_vector, v)).collect())
    }

    async fn initialize(&self) -> Result<()> {
        self.inspector.schema().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphmind_core::memory_store::InMemoryGraphStore;
    use graphmind_providers::stub::StubEmbeddingProvider;
    use std::time::Duration;

    #[tokio::test]
    async fn keywords_are_lowercased_and_split_on_punctuation() {
        let words = SchemaGuidedSearch::<InMemoryGraphStore, StubEmbeddingProvider>::keywords(
            "Who developed Relativity?",
        );
        assert_eq!(words, vec!["who", "developed", "relativity"]);
    }

    #[tokio::test]
    async fn ineffective_strategy_falls_back_to_full_scan() {
        let store = Arc::new(InMemoryGraphStore::new());
        store
            .add_entity(graphmind_core::entity::Entity::new("e1", "Einstein", "Person"))
            .await;
        let embeddings = Arc::new(StubEmbeddingProvider::new(4));
        let inspector = Arc::new(SchemaInspector::new(store.clone(), Duration::from_secs(60)));
        let search = SchemaGuidedSearch::new(store, embeddings, inspector);

        let strategy = SearchStrategy::default();
        let candidates = vec![Entity::new("e1", "Einstein", "Person")];
        let narrowed = search.narrow(candidates.clone(), &strategy);
        assert_eq!(narrowed.len(), candidates.len());
    }
}
