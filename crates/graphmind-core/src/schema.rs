//! Graph schema model produced by the schema inspector (spec.md §3, §4.3).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The inferred primary value kind of a property, used to steer extraction
/// and comparison heuristics in the search layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyValueKind {
    Integer,
    Float,
    Boolean,
    String,
}

/// Frequency and sample statistics for one property of a node or relation type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyInfo {
    /// Property name.
    pub name: String,

    /// How often this property is present, in `[0, 1]` of sampled instances.
    pub frequency: f64,

    /// Inferred primary value kind.
    pub value_kind: PropertyValueKind,

    /// Up to N sample string values (stringified), used for substring search.
    pub samples: Vec<String>,
}

/// `(source label, target label, count)` — one observed connection pattern
/// for a relationship type.
pub type RelationPattern = (String, String, u64);

/// Profile of one node label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeTypeInfo {
    pub label: String,
    pub approximate_count: u64,
    pub properties: HashMap<String, PropertyInfo>,
}

/// Profile of one relationship type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipTypeInfo {
    pub relation_type: String,
    pub total_count: u64,
    pub patterns: Vec<RelationPattern>,
    pub properties: HashMap<String, PropertyInfo>,
}

impl RelationshipTypeInfo {
    /// True iff `total_count` equals the sum of pattern counts — the
    /// invariant spec.md §3 requires once a schema is fully populated.
    #[must_use]
    pub fn patterns_sum_to_total(&self) -> bool {
        self.patterns.iter().map(|(_, _, c)| c).sum::<u64>() == self.total_count
    }
}

/// A schema-driven extraction pattern, e.g. "X is a Y" → relation type.
///
/// Carried on the schema rather than baked into the reasoner so that
/// question-side extraction stays language- and domain-agnostic (see
/// SPEC_FULL.md's Open Questions resolution).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionPattern {
    /// Human-readable name, e.g. `"is_a"`.
    pub name: String,
    /// Regex pattern text with two capture groups (subject, object).
    pub pattern: String,
    /// Relation type to assign to matches.
    pub relation_type: String,
}

/// One entry of the relation-weight table: a bias applied to relation
/// scoring for a given relation type (spec.md §3's "relation-weight tables").
pub type RelationWeight = (String, f64);

/// A one-shot profile of the underlying graph, built by the schema
/// inspector and shared read-only across concurrent sessions.
///
/// Once constructed a `GraphSchema` is never mutated; rebuilding produces
/// a brand-new instance which replaces the cached one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSchema {
    pub node_types: Vec<NodeTypeInfo>,
    pub relationship_types: Vec<RelationshipTypeInfo>,
    pub index_suggestions: Vec<String>,
    pub stop_words: Vec<String>,
    pub relation_weights: Vec<RelationWeight>,
    pub extraction_patterns: Vec<ExtractionPattern>,
}

impl GraphSchema {
    /// Look up a node type by label.
    #[must_use]
    pub fn node_type(&self, label: &str) -> Option<&NodeTypeInfo> {
        self.node_types.iter().find(|n| n.label == label)
    }

    /// Look up a relationship type.
    #[must_use]
    pub fn relationship_type(&self, relation_type: &str) -> Option<&RelationshipTypeInfo> {
        self.relationship_types
            .iter()
            .find(|r| r.relation_type == relation_type)
    }

    /// Configured weight for a relation type, or `1.0` if unlisted.
    #[must_use]
    pub fn relation_weight(&self, relation_type: &str) -> f64 {
        self.relation_weights
            .iter()
            .find(|(t, _)| t == relation_type)
            .map_or(1.0, |(_, w)| *w)
    }

    /// True iff `word` (case-insensitively) is in the schema's stop-word list.
    #[must_use]
    pub fn is_stop_word(&self, word: &str) -> bool {
        let lower = word.to_lowercase();
        self.stop_words.iter().any(|w| w.to_lowercase() == lower)
    }

    /// The degenerate schema the inspector falls back to when the graph
    /// store cannot enumerate labels (spec.md §6): a single `Entity` node
    /// type and a single `RELATED_TO` relationship type.
    #[must_use]
    pub fn degenerate() -> Self {
        Self {
            node_types: vec![NodeTypeInfo {
                label: "Entity".to_string(),
                approximate_count: 0,
                properties: HashMap::new(),
            }],
            relationship_types: vec![RelationshipTypeInfo {
                relation_type: "RELATED_TO".to_string(),
                total_count: 0,
                patterns: Vec::new(),
                properties: HashMap::new(),
            }],
            index_suggestions: Vec::new(),
            stop_words: default_stop_words(),
            relation_weights: Vec::new(),
            extraction_patterns: Vec::new(),
        }
    }
}

/// A small built-in English stop-word list, used as the schema's default
/// when a store doesn't supply its own (SPEC_FULL.md §9).
#[must_use]
pub fn default_stop_words() -> Vec<String> {
    [
        "a", "an", "the", "is", "are", "was", "were", "be", "been", "being", "of", "in", "on",
        "at", "to", "for", "with", "by", "and", "or", "but", "this", "that", "these", "those",
        "who", "what", "when", "where", "why", "how", "does", "do", "did", "it", "its",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

/// A ranked, scored hint produced by the schema inspector for a specific
/// question: which node types, relation types and properties are worth
/// searching first (spec.md §4.3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchStrategy {
    pub node_type_scores: Vec<(String, f64)>,
    pub relation_type_scores: Vec<(String, f64)>,
    pub search_properties: Vec<(String, Vec<String>)>,
}

impl SearchStrategy {
    /// Effective iff at least one node-type score and one relation score
    /// clear the configured thresholds (spec.md §4.3 defaults: 0.3 / 0.2).
    #[must_use]
    pub fn is_effective(&self, node_threshold: f64, relation_threshold: f64) -> bool {
        self.node_type_scores.iter().any(|(_, s)| *s >= node_threshold)
            && self
                .relation_type_scores
                .iter()
                .any(|(_, s)| *s >= relation_threshold)
    }

    /// Properties recommended for a given node type, if any were identified.
    #[must_use]
    pub fn properties_for(&self, node_type: &str) -> Option<&[String]> {
        self.search_properties
            .iter()
            .find(|(t, _)| t == node_type)
            .map(|(_, props)| props.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_schema_has_single_fallback_types() {
        let schema = GraphSchema::degenerate();
        assert_eq!(schema.node_types.len(), 1);
        assert_eq!(schema.node_types[0].label, "Entity");
        assert_eq!(schema.relationship_types.len(), 1);
        assert_eq!(schema.relationship_types[0].relation_type, "RELATED_TO");
    }

    #[test]
    fn relationship_invariant_sums_patterns() {
        let info = RelationshipTypeInfo {
            relation_type: "WORKED_AT".to_string(),
            total_count: 5,
            patterns: vec![
                ("Person".to_string(), "Location".to_string(), 3),
                ("Person".to_string(), "Org".to_string(), 2),
            ],
            properties: HashMap::new(),
        };
        assert!(info.patterns_sum_to_total());
    }

    #[test]
    fn search_strategy_effectiveness_threshold() {
        let mut strategy = SearchStrategy::default();
        strategy.node_type_scores.push(("Person".to_string(), 0.5));
        assert!(!strategy.is_effective(0.3, 0.2));
        strategy
            .relation_type_scores
            .push(("WORKED_AT".to_string(), 0.25));
        assert!(strategy.is_effective(0.3, 0.2));
    }

    #[test]
    fn is_stop_word_case_insensitive() {
        let schema = GraphSchema::degenerate();
        assert!(schema.is_stop_word("The"));
        assert!(!schema.is_stop_word("Einstein"));
    }
}
