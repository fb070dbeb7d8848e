//! Lexical substring plus embedding cosine search, with a fixed scope
//! (spec.md §4.5, "Basic").

use crate::engine::SearchEngine;
use async_trait::async_trait;
use graphmind_core::entity::{Entity, Relation};
use graphmind_core::error::Result;
use graphmind_core::store::GraphStore;
use graphmind_providers::embedding::{cosine, EmbeddingProvider};
use std::sync::Arc;

pub struct BasicSearch<S, E> {
    store: Arc<S>,
    embeddings: Arc<E>,
}

impl<S: GraphStore, E: EmbeddingProvider> BasicSearch<S, E> {
    #[must_use]
    pub fn new(store: Arc<S>, embeddings: Arc<E>) -> Self {
        Self { store, embeddings }
    }

    async fn candidate_entities(&self) -> Result<Vec<Entity>> {
        self.store.list_entities().await
    }

    async fn score_name(&self, query_text: &str, name: &str) -> Result<f64> {
        let lower_query = query_text.to_lowercase();
        let lower_name = name.to_lowercase();
        if lower_name == lower_query {
            return Ok(1.0);
        }
        if lower_name.contains(&lower_query) {
            return Ok(0.8);
        }
        // `cosine_similarity` returns [-1, 1]; `search_entities`/
        // `score_relations` scores must stay within [0, 1] (spec.md §4.5).
        Ok(self.cosine_similarity(query_text, name).await?.clamp(0.0, 1.0))
    }
}

#[async_trait]
impl<S: GraphStore, E: EmbeddingProvider> SearchEngine for BasicSearch<S, E> {
    async fn search_entities(&self, query_text: &str, k: usize) -> Result<Vec<(Entity, f64)>> {
        let candidates = self.candidate_entities().await?;
        let mut scored = Vec::with_capacity(candidates.len());
        for entity in candidates {
            let score = self.score_name(query_text, &entity.name).await?;
            scored.push((entity, score));
        }
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    async fn score_relations(
        &self,
        query_text: &str,
        relations: &[Relation],
    ) -> Result<Vec<(Relation, f64)>> {
        let mut scored = Vec::with_capacity(relations.len());
        for relation in relations {
            let score = self
                .score_name(query_text, &relation.relation_type)
                .await?;
            scored.push((relation.clone(), score));
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphmind_core::memory_store::InMemoryGraphStore;
    use graphmind_providers::stub::StubEmbeddingProvider;

    #[tokio::test]
    async fn exact_name_match_scores_highest() {
        let store = Arc::new(InMemoryGraphStore::new());
        let embeddings = Arc::new(StubEmbeddingProvider::new(4));
        let search = BasicSearch::new(store, embeddings);

        let score = search.score_name("Einstein", "Einstein").await.unwrap();
        assert!((score - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn substring_match_scores_above_embedding_fallback() {
        let store = Arc::new(InMemoryGraphStore::new());
        let embeddings = Arc::new(StubEmbeddingProvider::new(4));
        let search = BasicSearch::new(store, embeddings);

        let score = search.score_name("Einstein", "Albert Einstein").await.unwrap();
        assert!((score - 0.8).abs() < f64::EPSILON);
    }
}
