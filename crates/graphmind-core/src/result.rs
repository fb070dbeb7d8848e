//! Steps, paths and the final result bundle (spec.md §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One scored hop: `source -[relation]-> target`.
///
/// Equality is defined by the triple `(source_id, relation_type, target_id)`
/// per spec.md §3 — two observations of the same triple are the same step
/// for deduplication purposes, even if discovered at different times or
/// with slightly different scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningStep {
    pub source_id: String,
    pub source_name: String,
    pub relation_type: String,
    pub target_id: String,
    pub target_name: String,
    pub score: f64,
    pub depth: u32,
    pub confidence: f64,
    pub rationale: String,
    pub timestamp: DateTime<Utc>,
}

impl PartialEq for ReasoningStep {
    fn eq(&self, other: &Self) -> bool {
        self.source_id == other.source_id
            && self.relation_type == other.relation_type
            && self.target_id == other.target_id
    }
}
impl Eq for ReasoningStep {}

impl ReasoningStep {
    /// The triple identity used for deduplication.
    #[must_use]
    pub fn key(&self) -> (String, String, String) {
        (
            self.source_id.clone(),
            self.relation_type.clone(),
            self.target_id.clone(),
        )
    }

    /// The evidence line rendered for this step, e.g. `"Einstein -[DEVELOPED]-> Relativity"`.
    #[must_use]
    pub fn evidence_line(&self) -> String {
        format!(
            "{} -[{}]-> {}",
            self.source_name, self.relation_type, self.target_name
        )
    }

    /// A single step is valid iff its endpoints are both non-empty.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.source_id.is_empty() && !self.target_id.is_empty()
    }
}

/// An ordered chain of steps with a derived final score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningPath {
    pub steps: Vec<ReasoningStep>,
    pub final_score: f64,
}

impl ReasoningPath {
    /// Build a path from steps, deriving `final_score` via `scorer`.
    #[must_use]
    pub fn new(steps: Vec<ReasoningStep>, final_score: f64) -> Self {
        Self { steps, final_score }
    }

    /// Valid iff every step is valid and consecutive steps chain:
    /// `target(p_i).id == source(p_{i+1}).id` (spec.md §8).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        if self.steps.iter().any(|s| !s.is_valid()) {
            return false;
        }
        self.steps
            .windows(2)
            .all(|w| w[0].target_id == w[1].source_id)
    }

    /// Human-readable path description, e.g. `"A -> B -> C"`.
    #[must_use]
    pub fn description(&self) -> String {
        if self.steps.is_empty() {
            return String::new();
        }
        let mut parts = vec![self.steps[0].source_name.clone()];
        parts.extend(self.steps.iter().map(|s| s.target_name.clone()));
        parts.join(" -> ")
    }

    /// Number of hops in the path.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// The final, immutable result of answering one question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningResult {
    pub question: String,
    pub answer: String,
    pub steps: Vec<ReasoningStep>,
    pub evidence: Vec<String>,
    pub confidence: Option<f64>,
    pub path_scores: Vec<f64>,
    /// True when the session was ended by `session.cancel()` before completion.
    pub cancelled: bool,
    /// True when the answer was produced by degraded fallback behaviour
    /// (spec.md §7: schema unavailable, no entities extracted, or LLM unavailable).
    pub fallback: bool,
}

impl ReasoningResult {
    /// A minimal, non-empty fallback result for degraded paths (spec.md §7).
    #[must_use]
    pub fn fallback(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            steps: Vec::new(),
            evidence: Vec::new(),
            confidence: None,
            path_scores: Vec::new(),
            cancelled: false,
            fallback: true,
        }
    }

    /// Mark this result as produced by a cancelled session.
    #[must_use]
    pub fn cancelled(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: String::new(),
            steps: Vec::new(),
            evidence: Vec::new(),
            confidence: None,
            path_scores: Vec::new(),
            cancelled: true,
            fallback: false,
        }
    }
}

/// The result of a single multi-hop traversal run (distinct from the final
/// answer bundle so the traversal engine can be used standalone).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiHopResult {
    pub question: String,
    pub paths: Vec<ReasoningPath>,
    pub explored_entities: usize,
}
