//! Per-session reasoning configuration (spec.md §3, §6).

use serde::{Deserialize, Serialize};

/// Weights for the multi-hop path-score formula (spec.md §4.9):
/// `path_score = w_rel * rel_score + w_source * source_relevance + w_target * target_relevance`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathScoreWeights {
    pub relation: f64,
    pub source_relevance: f64,
    pub target_relevance: f64,
}

impl Default for PathScoreWeights {
    fn default() -> Self {
        Self {
            relation: 0.4,
            source_relevance: 0.2,
            target_relevance: 0.4,
        }
    }
}

/// Weights for the final path-ranking formula (spec.md §4.9):
/// `score = w_base * base + w_len * (1/sqrt(len)) + w_completeness * completeness
///          + w_semantic * semantic_relevance`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingWeights {
    pub base: f64,
    pub inverse_length: f64,
    pub completeness: f64,
    pub semantic_relevance: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            base: 0.4,
            inverse_length: 0.2,
            completeness: 0.2,
            semantic_relevance: 0.2,
        }
    }
}

/// Thresholds that decide when [`crate::result`]-producing context has
/// gathered "enough" evidence to stop expanding (spec.md §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvidenceThresholds {
    /// Stop once this many evidence lines have been collected.
    pub min_evidence_count: usize,
    /// Stop once the depth-weighted confidence accumulator exceeds this.
    pub min_cumulative_confidence: f64,
    /// Stop once this traversal depth has been reached.
    pub min_depth: u32,
}

impl Default for EvidenceThresholds {
    fn default() -> Self {
        Self {
            min_evidence_count: 5,
            min_cumulative_confidence: 2.0,
            min_depth: 3,
        }
    }
}

/// Stop conditions for the multi-hop traversal engine that aren't simple
/// depth/entity caps (spec.md §4.9: "≥ 3 paths with score > 0.7", "found-path
/// soft timeout").
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraversalStopConfig {
    /// A path scoring above this is considered "high-confidence".
    pub high_score_threshold: f64,
    /// Stop once this many high-confidence paths have been found in total.
    pub high_score_count_to_stop: usize,
    /// Stop this long after the first path is found, regardless of depth.
    pub found_path_soft_timeout_ms: u64,
}

impl Default for TraversalStopConfig {
    fn default() -> Self {
        Self {
            high_score_threshold: 0.7,
            high_score_count_to_stop: 3,
            found_path_soft_timeout_ms: 10_000,
        }
    }
}

/// Immutable per-session reasoning configuration (spec.md §3, defaults per §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningConfig {
    pub max_reasoning_depth: u32,
    pub search_width: usize,
    pub entity_similarity_threshold: f64,
    pub relation_similarity_threshold: f64,
    pub max_entities: usize,
    pub max_paths: usize,
    pub max_evidences: usize,
    pub session_budget_ms: u64,
    pub thread_pool_size: usize,
    pub io_pool_size: usize,
    pub batch_size: usize,
    pub embedding_cache_size: usize,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,
    pub confidence_threshold: f64,
    pub max_retries: u32,
    pub strict_validation: bool,

    /// Override for the traversal path-score weights (Open Question resolution:
    /// the spec's hard-coded 0.4/0.2/0.4 are the default, not a hard limit).
    pub path_score_weights: PathScoreWeights,
    /// Override for the final ranking weights.
    pub ranking_weights: RankingWeights,
    /// Depth decay base `d` in `d^depth` (spec.md §4.9 default: 0.8).
    pub depth_decay: f64,
    /// Bonus added for discovering a previously-unvisited target (default: 0.1).
    pub novelty_bonus: f64,
    /// Thresholds for "enough evidence gathered" (spec.md §4.6).
    pub evidence_thresholds: EvidenceThresholds,
    /// Traversal-level stop conditions beyond depth/entity caps (spec.md §4.9).
    pub traversal_stop: TraversalStopConfig,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            max_reasoning_depth: 3,
            search_width: 3,
            entity_similarity_threshold: 0.5,
            relation_similarity_threshold: 0.2,
            max_entities: 100,
            max_paths: 50,
            max_evidences: 10,
            session_budget_ms: 30_000,
            thread_pool_size: 4,
            io_pool_size: 2,
            batch_size: 10,
            embedding_cache_size: 1_000,
            llm_temperature: 0.2,
            llm_max_tokens: 256,
            confidence_threshold: 0.3,
            max_retries: 3,
            strict_validation: false,
            path_score_weights: PathScoreWeights::default(),
            ranking_weights: RankingWeights::default(),
            depth_decay: 0.8,
            novelty_bonus: 0.1,
            evidence_thresholds: EvidenceThresholds::default(),
            traversal_stop: TraversalStopConfig::default(),
        }
    }
}

impl ReasoningConfig {
    /// Session wall-clock budget as a [`std::time::Duration`].
    #[must_use]
    pub const fn session_budget(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.session_budget_ms)
    }
}
