//! Typed units of work submitted to the scheduler (spec.md §3, §4.8).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// The closed set of task kinds the scheduler and planner exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    EntityIdentification,
    RelationExploration,
    SimilarityCalculation,
    EvidenceCollection,
    AnswerGeneration,
    Validation,
    GraphTraversal,
    PathScoring,
    ResultAggregation,
    LlmGeneration,
    DatabaseQuery,
    EmbeddingCalculation,
}

impl TaskKind {
    /// Whether this kind of work is I/O-bound (store/LLM/embedding calls)
    /// as opposed to CPU-bound (scoring, traversal bookkeeping,
    /// aggregation) — drives the scheduler's pool selection (spec.md §4.8).
    #[must_use]
    pub const fn is_io_bound(self) -> bool {
        matches!(
            self,
            Self::DatabaseQuery
                | Self::EmbeddingCalculation
                | Self::LlmGeneration
                | Self::EntityIdentification
                | Self::RelationExploration
        )
    }
}

/// Lifecycle state of a submitted [`Task`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskState {
    /// True for any state a task cannot leave once reached.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// A typed unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub kind: TaskKind,
    pub priority: i32,
    pub timeout: Duration,
    pub context: HashMap<String, Value>,
    pub state: TaskState,
    pub submitted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl Task {
    /// Create a new, pending task.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: TaskKind, priority: i32, timeout: Duration) -> Self {
        Self {
            id: id.into(),
            kind,
            priority,
            timeout,
            context: HashMap::new(),
            state: TaskState::Pending,
            submitted_at: Utc::now(),
            started_at: None,
            ended_at: None,
            error: None,
        }
    }

    /// Builder-style context insertion.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    /// Mark the task as started.
    pub fn mark_running(&mut self) {
        self.state = TaskState::Running;
        self.started_at = Some(Utc::now());
    }

    /// Mark the task as completed.
    pub fn mark_completed(&mut self) {
        self.state = TaskState::Completed;
        self.ended_at = Some(Utc::now());
    }

    /// Mark the task as failed with an error message.
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.state = TaskState::Failed;
        self.error = Some(error.into());
        self.ended_at = Some(Utc::now());
    }

    /// Mark the task as cancelled.
    pub fn mark_cancelled(&mut self) {
        self.state = TaskState::Cancelled;
        self.ended_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_transitions_set_timestamps() {
        let mut task = Task::new("t1", TaskKind::GraphTraversal, 0, Duration::from_secs(1));
        assert_eq!(task.state, TaskState::Pending);
        task.mark_running();
        assert!(task.started_at.is_some());
        task.mark_completed();
        assert!(task.state.is_terminal());
        assert!(task.ended_at.is_some());
    }

    #[test]
    fn io_bound_classification_matches_decision_table() {
        assert!(TaskKind::DatabaseQuery.is_io_bound());
        assert!(TaskKind::EmbeddingCalculation.is_io_bound());
        assert!(!TaskKind::GraphTraversal.is_io_bound());
        assert!(!TaskKind::PathScoring.is_io_bound());
        assert!(!TaskKind::ResultAggregation.is_io_bound());
    }
}
