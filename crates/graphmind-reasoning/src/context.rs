//! Per-question mutable reasoning state (spec.md §3, §4.6, component C6).
//!
//! All mutations are serialized behind a single `parking_lot::Mutex`
//! guarding the context's inner state, for shared mutable counters that
//! never need to hold a lock across an `.await` (spec.md §5: "the
//! per-session `ReasoningContext` is the single serialization point for
//! evidence and path mutations").

use chrono::{DateTime, Utc};
use graphmind_core::config::ReasoningConfig;
use graphmind_core::entity::{Entity, Relation};
use graphmind_core::result::ReasoningStep;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tracing::debug;

/// One scored, timestamped evidence line consumed by the answer prompt
/// (spec.md §3, glossary: "a short textual record of a scored step").
#[derive(Debug, Clone)]
pub struct Evidence {
    pub line: String,
    pub score: f64,
    pub depth: u32,
    pub timestamp: DateTime<Utc>,
}

struct Inner {
    visited: HashMap<String, u32>,
    steps: Vec<ReasoningStep>,
    step_keys: HashSet<(String, String, String)>,
    evidences: Vec<Evidence>,
    frontier: HashMap<u32, Vec<Entity>>,
    confidence: f64,
    max_depth_reached: u32,
    total_relations: usize,
}

impl Inner {
    fn new() -> Self {
        Self {
            visited: HashMap::new(),
            steps: Vec::new(),
            step_keys: HashSet::new(),
            evidences: Vec::new(),
            frontier: HashMap::new(),
            confidence: 0.0,
            max_depth_reached: 0,
            total_relations: 0,
        }
    }
}

/// Per-session mutable state: frontier, visited set, evidences, timing.
/// Owned by exactly one session (spec.md §3).
pub struct ReasoningContext {
    pub question: String,
    config: ReasoningConfig,
    started_at: Instant,
    inner: Mutex<Inner>,
}

impl ReasoningContext {
    /// Create a fresh context for `question`, starting the wall-clock
    /// budget timer now.
    #[must_use]
    pub fn new(question: impl Into<String>, config: ReasoningConfig) -> Self {
        Self {
            question: question.into(),
            config,
            started_at: Instant::now(),
            inner: Mutex::new(Inner::new()),
        }
    }

    /// Idempotent on entity id: a repeated entity just bumps its visit
    /// counter. New entities are added to the depth-`depth` frontier
    /// bucket (spec.md §4.6).
    pub fn add_entities(&self, entities: &[Entity], depth: u32) {
        let mut inner = self.inner.lock();
        for entity in entities {
            let count = inner.visited.entry(entity.id.clone()).or_insert(0);
            if *count == 0 {
                inner.frontier.entry(depth).or_default().push(entity.clone());
            }
            *count += 1;
        }
        inner.max_depth_reached = inner.max_depth_reached.max(depth);
    }

    /// Append a scored step if its `(source, relation, target)` triple
    /// hasn't been observed before; otherwise bump the target's visit
    /// counter (spec.md §3: steps are deduplicated by triple, §8 testable
    /// property). Returns `true` iff a new step was recorded.
    pub fn add_reasoning_step(
        &self,
        source: &Entity,
        relation: &Relation,
        target: &Entity,
        score: f64,
        depth: u32,
        rationale: impl Into<String>,
    ) -> bool {
        let mut inner = self.inner.lock();
        let key = (source.id.clone(), relation.relation_type.clone(), target.id.clone());
        if inner.step_keys.contains(&key) {
            let count = inner.visited.entry(target.id.clone()).or_insert(1);
            *count += 1;
            return false;
        }

        let confidence_delta = score / f64::from(depth + 1);
        let step = ReasoningStep {
            source_id: source.id.clone(),
            source_name: source.name.clone(),
            relation_type: relation.relation_type.clone(),
            target_id: target.id.clone(),
            target_name: target.name.clone(),
            score,
            depth,
            confidence: confidence_delta,
            rationale: rationale.into(),
            timestamp: Utc::now(),
        };
        let evidence = Evidence {
            line: step.evidence_line(),
            score,
            depth,
            timestamp: step.timestamp,
        };

        inner.step_keys.insert(key);
        inner.steps.push(step);
        inner.evidences.push(evidence);
        inner.confidence += confidence_delta;
        inner.total_relations += 1;
        inner.max_depth_reached = inner.max_depth_reached.max(depth);
        inner.visited.entry(target.id.clone()).or_insert(0);
        *inner.visited.get_mut(&target.id).unwrap() += 1;

        debug!(
            source = %source.id, relation = %relation.relation_type, target = %target.id,
            score, depth, "reasoning step recorded"
        );
        true
    }

    /// True iff evidences ≥ `min_evidence_count` OR cumulative confidence
    /// exceeds `min_cumulative_confidence` OR depth ≥ `min_depth`
    /// (spec.md §4.6 defaults, overridable via [`ReasoningConfig`]).
    #[must_use]
    pub fn has_enough_evidence(&self) -> bool {
        let inner = self.inner.lock();
        let thresholds = &self.config.evidence_thresholds;
        inner.evidences.len() >= thresholds.min_evidence_count
            || inner.confidence > thresholds.min_cumulative_confidence
            || inner.max_depth_reached >= thresholds.min_depth
    }

    /// True iff depth ≥ `max_depth` OR explored ≥ `max_entities` OR
    /// [`Self::has_enough_evidence`] OR the session wall-clock budget has
    /// elapsed (spec.md §4.6).
    #[must_use]
    pub fn should_stop(&self, max_depth: u32, max_entities: usize) -> bool {
        let explored = self.inner.lock().visited.len();
        self.current_depth() >= max_depth
            || explored >= max_entities
            || self.has_enough_evidence()
            || self.elapsed() > self.config.session_budget()
    }

    /// Wall-clock time since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    /// Highest depth reached so far.
    #[must_use]
    pub fn current_depth(&self) -> u32 {
        self.inner.lock().max_depth_reached
    }

    /// Number of distinct entities visited so far.
    #[must_use]
    pub fn explored_entities(&self) -> usize {
        self.inner.lock().visited.len()
    }

    /// Visit count for one entity id (`0` if never visited).
    #[must_use]
    pub fn visit_count(&self, id: &str) -> u32 {
        self.inner.lock().visited.get(id).copied().unwrap_or(0)
    }

    /// True iff `id` has been visited at least once.
    #[must_use]
    pub fn is_visited(&self, id: &str) -> bool {
        self.inner.lock().visited.contains_key(id)
    }

    /// Snapshot of the frontier entities queued at `depth`.
    #[must_use]
    pub fn frontier_at(&self, depth: u32) -> Vec<Entity> {
        self.inner.lock().frontier.get(&depth).cloned().unwrap_or_default()
    }

    /// Snapshot of all recorded steps, in insertion order.
    #[must_use]
    pub fn steps(&self) -> Vec<ReasoningStep> {
        self.inner.lock().steps.clone()
    }

    /// Snapshot of all evidence lines, in insertion order.
    #[must_use]
    pub fn evidence_lines(&self) -> Vec<String> {
        self.inner.lock().evidences.iter().map(|e| e.line.clone()).collect()
    }

    /// Cumulative depth-weighted confidence accumulator.
    #[must_use]
    pub fn confidence(&self) -> f64 {
        self.inner.lock().confidence
    }

    /// Append an `[Indirect Connection]` evidence line produced by the
    /// relationship-query BFS augmentation (spec.md §4.10 step 5).
    pub fn add_indirect_evidence(&self, line: impl Into<String>, score: f64, depth: u32) {
        let mut inner = self.inner.lock();
        inner.evidences.push(Evidence {
            line: line.into(),
            score,
            depth,
            timestamp: Utc::now(),
        });
    }

    /// Total relations recorded as steps.
    #[must_use]
    pub fn total_relations(&self) -> usize {
        self.inner.lock().total_relations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphmind_core::config::ReasoningConfig;

    fn entity(id: &str) -> Entity {
        Entity::new(id, id, "Thing")
    }

    #[test]
    fn duplicate_triples_only_bump_visit_count() {
        let ctx = ReasoningContext::new("q", ReasoningConfig::default());
        let (a, b) = (entity("a"), entity("b"));
        let relation = Relation::new("a", "b", "KNOWS");

        assert!(ctx.add_reasoning_step(&a, &relation, &b, 0.5, 0, ""));
        assert!(!ctx.add_reasoning_step(&a, &relation, &b, 0.9, 0, ""));
        assert_eq!(ctx.steps().len(), 1);
        assert_eq!(ctx.visit_count("b"), 2);
    }

    #[test]
    fn confidence_accumulates_depth_weighted() {
        let ctx = ReasoningContext::new("q", ReasoningConfig::default());
        let (a, b, c) = (entity("a"), entity("b"), entity("c"));
        ctx.add_reasoning_step(&a, &Relation::new("a", "b", "R"), &b, 1.0, 0, "");
        ctx.add_reasoning_step(&b, &Relation::new("b", "c", "R"), &c, 1.0, 1, "");
        assert!((ctx.confidence() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn has_enough_evidence_triggers_on_count() {
        let mut cfg = ReasoningConfig::default();
        cfg.evidence_thresholds.min_evidence_count = 2;
        let ctx = ReasoningContext::new("q", cfg);
        let a = entity("a");
        for i in 0..2 {
            let target = entity(&format!("t{i}"));
            ctx.add_reasoning_step(&a, &Relation::new("a", &format!("t{i}"), "R"), &target, 0.1, 0, "");
        }
        assert!(ctx.has_enough_evidence());
    }

    #[test]
    fn add_entities_is_idempotent_on_id() {
        let ctx = ReasoningContext::new("q", ReasoningConfig::default());
        ctx.add_entities(&[entity("a")], 0);
        ctx.add_entities(&[entity("a")], 0);
        assert_eq!(ctx.explored_entities(), 1);
        assert_eq!(ctx.visit_count("a"), 2);
        assert_eq!(ctx.frontier_at(0).len(), 1);
    }
}
