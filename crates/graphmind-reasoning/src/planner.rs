//! Pure `(question, schema, config) -> QueryPlan` planning (spec.md §4.7,
//! component C7). The planner has no side effects and never touches the
//! store, the LLM, or the embedding provider — it only shapes the DAG the
//! scheduler will later execute.

use graphmind_core::schema::GraphSchema;
use graphmind_core::task::TaskKind;

/// How the scheduler should sequence a [`QueryPlan`]'s steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Run steps strictly in dependency order, one at a time.
    Sequential,
    /// Independent step groups may run concurrently.
    Parallel,
    /// Run the critical path sequentially, then fan out whatever remains.
    Adaptive,
}

/// One typed step in a [`QueryPlan`], with its declared dependencies
/// (spec.md §4.7's canonical DAG: 1→2→3→4→5→6).
#[derive(Debug, Clone)]
pub struct PlanStep {
    pub kind: TaskKind,
    pub depends_on: Vec<TaskKind>,
}

/// An ordered plan of typed steps plus a strategy tag.
#[derive(Debug, Clone)]
pub struct QueryPlan {
    pub steps: Vec<PlanStep>,
    pub strategy: Strategy,
    /// Free-text intent label surfaced to the answer-generation prompt
    /// (spec.md §4.10 step 4, "set the query intent").
    pub intent: String,
}

impl QueryPlan {
    /// Steps with no unmet dependency — the plan's critical-path start.
    #[must_use]
    pub fn ready_steps(&self, completed: &[TaskKind]) -> Vec<&PlanStep> {
        self.steps
            .iter()
            .filter(|s| s.depends_on.iter().all(|d| completed.contains(d)))
            .filter(|s| !completed.contains(&s.kind))
            .collect()
    }
}

/// Word-count threshold below which a question is "short" for strategy
/// selection purposes (spec.md §4.7 doesn't pin a number; this resolves it
/// the same way SPEC_FULL.md resolves other unspecified magic numbers —
/// as a named, adjustable constant rather than an inline literal).
const SHORT_QUESTION_WORD_LIMIT: usize = 8;
/// Node-type-count threshold below which a schema counts as "small".
const SMALL_SCHEMA_TYPE_LIMIT: usize = 5;
/// Minimum distinct capitalized tokens to infer "multiple independent
/// entity families mentioned" (spec.md §4.7's parallel-strategy trigger).
const MULTI_ENTITY_FAMILY_THRESHOLD: usize = 2;

/// Canonical plan for the schema-aware reasoner: six steps with the
/// dependency DAG from spec.md §4.7, strategy chosen from question length,
/// schema size, and a rough count of distinct entity mentions.
#[must_use]
pub fn plan(question: &str, schema: &GraphSchema) -> QueryPlan {
    let steps = vec![
        PlanStep {
            kind: TaskKind::EntityIdentification,
            depends_on: vec![],
        },
        PlanStep {
            kind: TaskKind::RelationExploration,
            depends_on: vec![TaskKind::EntityIdentification],
        },
        PlanStep {
            kind: TaskKind::SimilarityCalculation,
            depends_on: vec![TaskKind::RelationExploration],
        },
        PlanStep {
            kind: TaskKind::EvidenceCollection,
            depends_on: vec![TaskKind::SimilarityCalculation],
        },
        PlanStep {
            kind: TaskKind::AnswerGeneration,
            depends_on: vec![TaskKind::EvidenceCollection],
        },
        PlanStep {
            kind: TaskKind::Validation,
            depends_on: vec![TaskKind::AnswerGeneration],
        },
    ];

    let strategy = select_strategy(question, schema);
    let intent = infer_intent(question);

    QueryPlan {
        steps,
        strategy,
        intent,
    }
}

fn select_strategy(question: &str, schema: &GraphSchema) -> Strategy {
    let word_count = question.split_whitespace().count();
    let small_schema = schema.node_types.len() < SMALL_SCHEMA_TYPE_LIMIT;

    if word_count <= SHORT_QUESTION_WORD_LIMIT && small_schema {
        return Strategy::Sequential;
    }
    if count_capitalized_tokens(question) >= MULTI_ENTITY_FAMILY_THRESHOLD {
        return Strategy::Parallel;
    }
    Strategy::Adaptive
}

fn count_capitalized_tokens(question: &str) -> usize {
    question
        .split_whitespace()
        .filter(|w| w.chars().next().is_some_and(char::is_uppercase))
        .count()
}

/// Very small intent classifier: relationship-between-entities questions
/// get `"relationship"`, comparisons get `"comparison"`, everything else
/// is `"lookup"`. This is the pre-LLM hint; the reasoner refines it with
/// whatever the extraction prompt returns.
fn infer_intent(question: &str) -> String {
    let lower = question.to_lowercase();
    if lower.contains("relationship") || lower.contains("关系") || lower.contains("connect") {
        "relationship".to_string()
    } else if lower.contains("compare") || lower.contains(" vs ") || lower.contains("difference") {
        "comparison".to_string()
    } else {
        "lookup".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn small_schema() -> GraphSchema {
        GraphSchema {
            node_types: vec![graphmind_core::schema::NodeTypeInfo {
                label: "Person".to_string(),
                approximate_count: 1,
                properties: HashMap::new(),
            }],
            relationship_types: vec![],
            index_suggestions: vec![],
            stop_words: vec![],
            relation_weights: vec![],
            extraction_patterns: vec![],
        }
    }

    #[test]
    fn dependency_dag_matches_spec() {
        let p = plan("Who developed relativity?", &small_schema());
        assert_eq!(p.steps.len(), 6);
        assert_eq!(p.steps[0].kind, TaskKind::EntityIdentification);
        assert!(p.steps[0].depends_on.is_empty());
        assert_eq!(p.steps[5].depends_on, vec![TaskKind::AnswerGeneration]);
    }

    #[test]
    fn short_question_small_schema_is_sequential() {
        let p = plan("Who developed relativity?", &small_schema());
        assert_eq!(p.strategy, Strategy::Sequential);
    }

    #[test]
    fn multiple_capitalized_entities_trigger_parallel() {
        let mut schema = small_schema();
        for i in 0..10 {
            schema.node_types.push(graphmind_core::schema::NodeTypeInfo {
                label: format!("Type{i}"),
                approximate_count: 1,
                properties: HashMap::new(),
            });
        }
        let p = plan(
            "How are Einstein and Princeton and Germany connected to each other across many decades of history",
            &schema,
        );
        assert_eq!(p.strategy, Strategy::Parallel);
    }

    #[test]
    fn relationship_keyword_sets_intent() {
        let p = plan("What is the relationship between A and B?", &small_schema());
        assert_eq!(p.intent, "relationship");
    }

    #[test]
    fn ready_steps_respects_dependencies() {
        let p = plan("Q", &small_schema());
        let ready = p.ready_steps(&[]);
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].kind, TaskKind::EntityIdentification);

        let ready_after_first = p.ready_steps(&[TaskKind::EntityIdentification]);
        assert_eq!(ready_after_first.len(), 1);
        assert_eq!(ready_after_first[0].kind, TaskKind::RelationExploration);
    }
}
