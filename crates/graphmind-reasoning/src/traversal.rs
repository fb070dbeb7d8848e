//! The multi-hop traversal engine (spec.md §4.9, component C9): BFS-style
//! frontier expansion with per-edge scoring, depth penalty, novelty bonus
//! and stop conditions.
//!
//! This is the canonical traversal path (SPEC_FULL.md's Open Questions
//! resolution: there is no separate "simple" engine the reasoner silently
//! falls back to).

use crate::context::ReasoningContext;
use graphmind_core::config::ReasoningConfig;
use graphmind_core::entity::Entity;
use graphmind_core::error::Result;
use graphmind_core::result::{MultiHopResult, ReasoningPath, ReasoningStep};
use graphmind_core::store::GraphStore;
use graphmind_search::engine::SearchEngine;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Runs the frontier-expansion loop described in spec.md §4.9, consuming a
/// [`GraphStore`] for neighbor lookups and a [`SearchEngine`] for relation
/// scoring and semantic relevance.
pub struct MultiHopEngine<S, Search> {
    store: Arc<S>,
    search: Arc<Search>,
}

impl<S: GraphStore, Search: SearchEngine> MultiHopEngine<S, Search> {
    #[must_use]
    pub fn new(store: Arc<S>, search: Arc<Search>) -> Self {
        Self { store, search }
    }

    /// Expand outward from `start_entities`, recording every scored step in
    /// `ctx`, then return the top-ranked [`ReasoningPath`]s.
    ///
    /// # Errors
    /// Propagates store/search errors that aren't recoverable per-call
    /// (most per-entity failures are logged and skipped so one bad lookup
    /// doesn't abort the whole traversal — spec.md §7).
    pub async fn traverse(
        &self,
        question: &str,
        start_entities: Vec<Entity>,
        config: &ReasoningConfig,
        ctx: &ReasoningContext,
    ) -> Result<MultiHopResult> {
        let start_ids: HashSet<String> = start_entities.iter().map(|e| e.id.clone()).collect();
        ctx.add_entities(&start_entities, 0);

        let mut depth: u32 = 0;
        let mut high_score_paths = 0usize;
        let mut first_path_found_at: Option<Instant> = None;
        let soft_timeout = Duration::from_millis(config.traversal_stop.found_path_soft_timeout_ms);

        loop {
            if ctx.should_stop(config.max_reasoning_depth, config.max_entities) {
                debug!(depth, "traversal stopping: should_stop condition met");
                break;
            }
            let frontier = ctx.frontier_at(depth);
            if frontier.is_empty() {
                debug!(depth, "traversal stopping: empty frontier");
                break;
            }

            let mut found_any_this_depth = false;
            for entity in &frontier {
                let relations = match self.store.entity_relations(&entity.id).await {
                    Ok(r) => r,
                    Err(e) => {
                        debug!(entity = %entity.id, error = %e, "relation lookup failed, skipping");
                        continue;
                    }
                };
                let scored = match self.search.score_relations(question, &relations).await {
                    Ok(s) => s,
                    Err(e) => {
                        debug!(entity = %entity.id, error = %e, "relation scoring failed, skipping");
                        continue;
                    }
                };

                let mut kept: Vec<_> = scored
                    .into_iter()
                    .filter(|(_, score)| *score > config.relation_similarity_threshold)
                    .collect();
                kept.truncate(config.search_width);

                for (relation, rel_score) in kept {
                    let Some(other_id) = relation.other_endpoint(&entity.id) else {
                        continue;
                    };
                    let target = match self.store.find_entity(other_id).await {
                        Ok(Some(t)) => t,
                        Ok(None) => {
                            debug!(target = other_id, "dangling relation target unresolvable, dropping step");
                            continue;
                        }
                        Err(e) => {
                            debug!(error = %e, "target lookup failed, dropping step");
                            continue;
                        }
                    };

                    let unvisited = !ctx.is_visited(&target.id);
                    let source_relevance = self
                        .search
                        .cosine_similarity(question, &entity.name)
                        .await
                        .unwrap_or(0.0);
                    let target_relevance = self
                        .search
                        .cosine_similarity(question, &target.name)
                        .await
                        .unwrap_or(0.0);

                    let w = &config.path_score_weights;
                    let base = w.relation * rel_score
                        + w.source_relevance * source_relevance
                        + w.target_relevance * target_relevance;
                    let depth_factor = config.depth_decay.powi(i32::try_from(depth).unwrap_or(i32::MAX));
                    let novelty = if unvisited { config.novelty_bonus } else { 0.0 };
                    let path_score = (base * depth_factor + novelty).clamp(0.0, 1.0);

                    let rationale = rationale_for(&relation.relation_type);
                    let added = ctx.add_reasoning_step(entity, &relation, &target, path_score, depth, rationale);
                    if added {
                        found_any_this_depth = true;
                        if first_path_found_at.is_none() {
                            first_path_found_at = Some(Instant::now());
                        }
                        if path_score > config.traversal_stop.high_score_threshold {
                            high_score_paths += 1;
                        }
                        if unvisited {
                            ctx.add_entities(std::slice::from_ref(&target), depth + 1);
                        }
                    }
                }
            }

            if !found_any_this_depth {
                debug!(depth, "traversal stopping: no new paths found this depth");
                break;
            }
            if high_score_paths >= config.traversal_stop.high_score_count_to_stop {
                debug!(high_score_paths, "traversal stopping: enough high-confidence paths");
                break;
            }
            if first_path_found_at.is_some_and(|t| t.elapsed() > soft_timeout) {
                debug!("traversal stopping: found-path soft timeout elapsed");
                break;
            }
            depth += 1;
        }

        let raw_paths = build_paths(&ctx.steps(), &start_ids);
        let mut ranked = rank_paths(raw_paths, question, self.search.as_ref(), config).await;
        ranked.truncate(config.max_paths.min(config.max_evidences));

        info!(
            paths = ranked.len(),
            explored = ctx.explored_entities(),
            depth,
            "multi-hop traversal complete"
        );

        Ok(MultiHopResult {
            question: question.to_string(),
            paths: ranked,
            explored_entities: ctx.explored_entities(),
        })
    }
}

/// Reconstruct one [`ReasoningPath`] per recorded step by walking back
/// through the first-seen parent chain to a start entity. Shared prefixes
/// naturally appear in multiple reconstructed paths; final ranking and
/// truncation (not deduplication) decides which ones survive.
fn build_paths(steps: &[ReasoningStep], start_ids: &HashSet<String>) -> Vec<ReasoningPath> {
    let mut parent: HashMap<String, &ReasoningStep> = HashMap::new();
    for step in steps {
        parent.entry(step.target_id.clone()).or_insert(step);
    }

    let mut paths = Vec::with_capacity(steps.len());
    for step in steps {
        let mut chain = vec![step.clone()];
        let mut current_source = step.source_id.clone();
        let mut guard = 0;
        while !start_ids.contains(&current_source) && guard < steps.len() {
            guard += 1;
            let Some(parent_step) = parent.get(&current_source) else {
                break;
            };
            chain.push((*parent_step).clone());
            current_source = parent_step.source_id.clone();
        }
        chain.reverse();
        paths.push(ReasoningPath::new(chain, 0.0));
    }
    paths
}

/// Final ranking (spec.md §4.9): `0.4*base + 0.2*(1/sqrt(len)) +
/// 0.2*completeness + 0.2*semantic_relevance`, weights overridable via
/// [`graphmind_core::config::RankingWeights`].
async fn rank_paths<Search: SearchEngine>(
    paths: Vec<ReasoningPath>,
    question: &str,
    search: &Search,
    config: &ReasoningConfig,
) -> Vec<ReasoningPath> {
    let mut ranked = Vec::with_capacity(paths.len());
    for path in paths {
        if !path.is_valid() || path.is_empty() {
            continue;
        }
        #[allow(clippy::cast_precision_loss)]
        let base = path.steps.iter().map(|s| s.score).sum::<f64>() / path.len() as f64;
        #[allow(clippy::cast_precision_loss)]
        let inverse_length = 1.0 / (path.len() as f64).sqrt();
        #[allow(clippy::cast_precision_loss)]
        let completeness = (path.len() as f64 / f64::from(config.max_reasoning_depth.max(1))).min(1.0);

        let texts: Vec<String> = path
            .steps
            .iter()
            .map(|s| format!("{} {} {}", s.source_name, s.relation_type, s.target_name))
            .collect();
        let sims = search
            .cosine_similarities(question, &texts)
            .await
            .unwrap_or_default();
        #[allow(clippy::cast_precision_loss)]
        let semantic_relevance = if sims.is_empty() {
            0.0
        } else {
            sims.iter().sum::<f64>() / sims.len() as f64
        };

        let w = &config.ranking_weights;
        let final_score = (w.base * base
            + w.inverse_length * inverse_length
            + w.completeness * completeness
            + w.semantic_relevance * semantic_relevance)
            .clamp(0.0, 1.0);

        ranked.push(ReasoningPath::new(path.steps, final_score));
    }
    ranked.sort_by(|a, b| b.final_score.partial_cmp(&a.final_score).unwrap_or(std::cmp::Ordering::Equal));
    ranked
}

/// Short rationale templated off the relation type (spec.md §4.9 step 4).
fn rationale_for(relation_type: &str) -> String {
    let lower = relation_type.to_lowercase();
    if lower.contains("born") || lower.contains("birth") {
        format!("connects through a birth relation ({relation_type})")
    } else if lower.contains("develop") || lower.contains("creat") {
        format!("connects through a creation/development relation ({relation_type})")
    } else if lower.contains("work") || lower.contains("employ") {
        format!("connects through an employment relation ({relation_type})")
    } else {
        format!("connects through {relation_type}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphmind_core::entity::Relation;
    use graphmind_core::memory_store::InMemoryGraphStore;
    use graphmind_search::basic::BasicSearch;
    use graphmind_providers::stub::StubEmbeddingProvider;

    async fn einstein_store() -> Arc<InMemoryGraphStore> {
        let store = InMemoryGraphStore::new();
        store.add_entity(Entity::new("einstein", "Einstein", "Person")).await;
        store.add_entity(Entity::new("relativity", "Relativity", "Theory")).await;
        store
            .add_relation(Relation::new("einstein", "relativity", "DEVELOPED"))
            .await;
        Arc::new(store)
    }

    #[tokio::test]
    async fn single_hop_produces_one_evidence_line() {
        let store = einstein_store().await;
        let embeddings = Arc::new(StubEmbeddingProvider::new(8));
        let search = Arc::new(BasicSearch::new(store.clone(), embeddings));
        let engine = MultiHopEngine::new(store.clone(), search);

        let config = ReasoningConfig::default();
        let ctx = ReasoningContext::new("Who developed the Theory of Relativity?", config.clone());
        let start = store.find_entity("einstein").await.unwrap().unwrap();

        let result = engine
            .traverse("Who developed the Theory of Relativity?", vec![start], &config, &ctx)
            .await
            .unwrap();

        let lines = ctx.evidence_lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("Einstein"));
        assert!(lines[0].contains("DEVELOPED"));
        assert!(lines[0].contains("Relativity"));
        assert!(!result.paths.is_empty());
    }

    #[tokio::test]
    async fn dangling_relation_target_is_dropped_not_fatal() {
        let store = InMemoryGraphStore::new();
        store.add_entity(Entity::new("a", "A", "Thing")).await;
        store.add_relation(Relation::new("a", "missing", "REL")).await;
        let store = Arc::new(store);
        let embeddings = Arc::new(StubEmbeddingProvider::new(8));
        let search = Arc::new(BasicSearch::new(store.clone(), embeddings));
        let engine = MultiHopEngine::new(store.clone(), search);

        let config = ReasoningConfig::default();
        let ctx = ReasoningContext::new("q", config.clone());
        let start = store.find_entity("a").await.unwrap().unwrap();

        let result = engine.traverse("q", vec![start], &config, &ctx).await.unwrap();
        assert!(result.paths.is_empty());
        assert_eq!(ctx.evidence_lines().len(), 0);
    }

    #[tokio::test]
    async fn depth_zero_with_no_neighbors_returns_empty_paths() {
        let store = InMemoryGraphStore::new();
        store.add_entity(Entity::new("lonely", "Lonely", "Thing")).await;
        let store = Arc::new(store);
        let embeddings = Arc::new(StubEmbeddingProvider::new(8));
        let search = Arc::new(BasicSearch::new(store.clone(), embeddings));
        let engine = MultiHopEngine::new(store.clone(), search);

        let config = ReasoningConfig::default();
        let ctx = ReasoningContext::new("q", config.clone());
        let start = store.find_entity("lonely").await.unwrap().unwrap();

        let result = engine.traverse("q", vec![start], &config, &ctx).await.unwrap();
        assert!(result.paths.is_empty());
    }
}
