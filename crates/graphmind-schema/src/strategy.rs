//! Derives a [`SearchStrategy`] from a question's keywords and a built
//! [`GraphSchema`] (spec.md §4.3).
//!
//! Scoring combines two signals: a word-overlap heuristic (how many of a
//! label's words, split on case and underscore boundaries, appear among
//! the question's keywords) and a substring-match bonus against the
//! schema's sampled property values (spec.md §4.3: "word-overlap
//! heuristics plus substring matches against sampled property values").
//! Neither signal needs the embedding provider, so strategy derivation
//! stays available even when the embedding adapter is down (spec.md §7).

use graphmind_core::schema::{GraphSchema, PropertyInfo, SearchStrategy};
use std::collections::{HashMap, HashSet};

/// Weight applied to the sample-substring-match signal relative to the
/// word-overlap signal when combining the two into one type score.
const SAMPLE_MATCH_WEIGHT: f64 = 0.5;

/// Fraction of a type's sampled property values that contain (or are
/// contained by) one of the question's keywords, case-insensitively.
/// `0.0` when the type has no sampled values at all.
fn sample_match_score(properties: &HashMap<String, PropertyInfo>, keyword_set: &HashSet<String>) -> f64 {
    let mut hits = 0usize;
    let mut total = 0usize;
    for info in properties.values() {
        for sample in &info.samples {
            total += 1;
            let sample_lower = sample.to_lowercase();
            if keyword_set
                .iter()
                .any(|k| sample_lower.contains(k.as_str()) || k.contains(sample_lower.as_str()))
            {
                hits += 1;
            }
        }
    }
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

/// Split a label like `"WORKED_AT"` or `"PersonName"` into lowercase words.
fn label_words(label: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for ch in label.chars() {
        if ch == '_' || ch == '-' || ch.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        current.push(ch.to_ascii_lowercase());
        prev_lower = ch.is_lowercase();
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Derive a [`SearchStrategy`] scoring each node/relation type by overlap
/// between its label words and `keywords`.
#[must_use]
pub fn derive_strategy(schema: &GraphSchema, keywords: &[String]) -> SearchStrategy {
    let keyword_set: HashSet<String> = keywords.iter().map(|k| k.to_lowercase()).collect();

    let mut node_type_scores = Vec::new();
    for node in &schema.node_types {
        let words = label_words(&node.label);
        if words.is_empty() {
            continue;
        }
        let hits = words.iter().filter(|w| keyword_set.contains(*w)).count();
        let word_score = hits as f64 / words.len() as f64;
        let sample_score = sample_match_score(&node.properties, &keyword_set);
        let score = (word_score + SAMPLE_MATCH_WEIGHT * sample_score).min(1.0);
        if score > 0.0 {
            node_type_scores.push((node.label.clone(), score));
        }
    }
    node_type_scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut relation_type_scores = Vec::new();
    for relation in &schema.relationship_types {
        let words = label_words(&relation.relation_type);
        if words.is_empty() {
            continue;
        }
        let hits = words.iter().filter(|w| keyword_set.contains(*w)).count();
        let word_score = hits as f64 / words.len() as f64;
        let sample_score = sample_match_score(&relation.properties, &keyword_set);
        let base = (word_score + SAMPLE_MATCH_WEIGHT * sample_score).min(1.0);
        let weighted = base * schema.relation_weight(&relation.relation_type);
        if weighted > 0.0 {
            relation_type_scores.push((relation.relation_type.clone(), weighted));
        }
    }
    relation_type_scores
        .sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let search_properties = schema
        .node_types
        .iter()
        .filter(|n| node_type_scores.iter().any(|(l, _)| l == &n.label))
        .map(|n| {
            let mut props: Vec<String> = n.properties.keys().cloned().collect();
            props.sort_unstable();
            (n.label.clone(), props)
        })
        .collect();

    SearchStrategy {
        node_type_scores,
        relation_type_scores,
        search_properties,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphmind_core::schema::{GraphSchema, NodeTypeInfo, RelationshipTypeInfo};
    use std::collections::HashMap;

    fn schema() -> GraphSchema {
        GraphSchema {
            node_types: vec![
                NodeTypeInfo {
                    label: "Person".to_string(),
                    approximate_count: 10,
                    properties: HashMap::new(),
                },
                NodeTypeInfo {
                    label: "Location".to_string(),
                    approximate_count: 5,
                    properties: HashMap::new(),
                },
            ],
            relationship_types: vec![RelationshipTypeInfo {
                relation_type: "WORKED_AT".to_string(),
                total_count: 3,
                patterns: Vec::new(),
                properties: HashMap::new(),
            }],
            index_suggestions: Vec::new(),
            stop_words: Vec::new(),
            relation_weights: Vec::new(),
            extraction_patterns: Vec::new(),
        }
    }

    #[test]
    fn label_words_splits_camel_and_snake_case() {
        assert_eq!(label_words("WORKED_AT"), vec!["worked", "at"]);
        assert_eq!(label_words("PersonName"), vec!["person", "name"]);
    }

    #[test]
    fn scores_rank_best_overlap_first() {
        let schema = schema();
        let keywords = vec!["person".to_string(), "worked".to_string()];
        let strategy = derive_strategy(&schema, &keywords);

        assert_eq!(strategy.node_type_scores[0].0, "Person");
        assert!(strategy.node_type_scores.iter().all(|(l, _)| l != "Location"));
        assert_eq!(strategy.relation_type_scores[0].0, "WORKED_AT");
    }

    #[test]
    fn sample_substring_match_surfaces_a_type_with_no_label_overlap() {
        let mut schema = schema();
        // "Location" shares no words with the keyword "princeton", but one
        // of its sampled property values does contain it.
        schema.node_types[1].properties.insert(
            "name".to_string(),
            PropertyInfo {
                name: "name".to_string(),
                frequency: 1.0,
                value_kind: graphmind_core::schema::PropertyValueKind::String,
                samples: vec!["Princeton".to_string(), "Berlin".to_string()],
            },
        );
        let keywords = vec!["princeton".to_string()];
        let strategy = derive_strategy(&schema, &keywords);

        let location_score = strategy
            .node_type_scores
            .iter()
            .find(|(l, _)| l == "Location")
            .map(|(_, s)| *s);
        assert_eq!(location_score, Some(0.25));
    }
}
