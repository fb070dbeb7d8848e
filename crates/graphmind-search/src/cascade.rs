//! The prioritized match cascade used by [`crate::schema_guided::SchemaGuidedSearch`]
//! (spec.md §4.5): exact match, then progressively shorter fuzzy prefixes
//! down to length 2, then a final fallback pass.
//!
//! Fuzzy-prefix scoring isn't specified numerically; this implementation
//! resolves that by scaling with how much of the query matched
//! (`0.3 + 0.4 * prefix_len/query_len`), so a near-complete prefix match
//! still trails a true exact match (1.0) but beats the 0.3 catch-all floor.

use graphmind_core::entity::Entity;
use std::collections::HashMap;

/// Run the cascade over `candidates`, stopping as soon as `k` distinct
/// entities have been collected at the current stage. Ties and overlaps
/// across stages keep the maximum score observed for an id.
#[must_use]
pub fn cascade_score(candidates: &[Entity], query: &str, k: usize) -> Vec<(Entity, f64)> {
    let mut results: HashMap<String, (Entity, f64)> = HashMap::new();
    let lower_query = query.to_lowercase();

    for entity in candidates {
        if entity.name.to_lowercase() == lower_query {
            upsert_max(&mut results, entity, 1.0);
        }
    }
    if results.len() >= k {
        return finalize(results, k);
    }

    let query_len = lower_query.chars().count();
    if query_len >= 2 {
        // For queries longer than the minimum, skip the full-length prefix
        // (the exact-match stage above already covers it) and start one
        // shorter. A query already at the length-2 floor gets exactly one
        // attempt, at its own length.
        let mut prefix_len = if query_len > 2 { query_len - 1 } else { query_len };
        loop {
            let prefix: String = lower_query.chars().take(prefix_len).collect();
            for entity in candidates {
                if entity.name.to_lowercase().starts_with(&prefix) {
                    let score = 0.3 + 0.4 * (prefix_len as f64 / query_len as f64);
                    upsert_max(&mut results, entity, score);
                }
            }
            if results.len() >= k || prefix_len == 2 {
                break;
            }
            prefix_len -= 1;
        }
        if results.len() >= k {
            return finalize(results, k);
        }
    }

    for entity in candidates {
        if results.contains_key(&entity.id) {
            continue;
        }
        let score = if entity.name.to_lowercase().contains(&lower_query) {
            0.9
        } else {
            0.3
        };
        upsert_max(&mut results, entity, score);
        if results.len() >= k {
            break;
        }
    }

    finalize(results, k)
}

fn upsert_max(results: &mut HashMap<String, (Entity, f64)>, entity: &Entity, score: f64) {
    results
        .entry(entity.id.clone())
        .and_modify(|(_, existing)| {
            if score > *existing {
                *existing = score;
            }
        })
        .or_insert_with(|| (entity.clone(), score));
}

fn finalize(results: HashMap<String, (Entity, f64)>, k: usize) -> Vec<(Entity, f64)> {
    let mut out: Vec<(Entity, f64)> = results.into_values().collect();
    out.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    out.truncate(k);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entities() -> Vec<Entity> {
        vec![
            Entity::new("1", "Einstein", "Person"),
            Entity::new("2", "Eisenhower", "Person"),
            Entity::new("3", "Albert Einstein Museum", "Location"),
            Entity::new("4", "Plato", "Person"),
        ]
    }

    #[test]
    fn exact_match_wins_and_stops_early() {
        let results = cascade_score(&entities(), "Einstein", 1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.name, "Einstein");
        assert!((results[0].1 - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn fuzzy_prefix_finds_related_names() {
        let results = cascade_score(&entities(), "Einst", 5);
        let names: Vec<&str> = results.iter().map(|(e, _)| e.name.as_str()).collect();
        assert!(names.contains(&"Einstein"));
    }

    #[test]
    fn two_char_query_still_gets_a_prefix_attempt() {
        let candidates = vec![Entity::new("1", "Albert Einstein", "Person")];
        let results = cascade_score(&candidates, "Al", 5);
        assert_eq!(results.len(), 1);
        assert!((results[0].1 - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn fallback_prefers_containment_over_catch_all() {
        let candidates = vec![
            Entity::new("1", "The Museum of Einstein Artifacts", "Location"),
            Entity::new("2", "Plato", "Person"),
        ];
        let results = cascade_score(&candidates, "zz", 2);
        let contains_match = results.iter().find(|(e, _)| e.id == "1").unwrap();
        let catch_all = results.iter().find(|(e, _)| e.id == "2").unwrap();
        assert!(contains_match.1 >= catch_all.1);
    }

    #[test]
    fn dedup_keeps_max_score_across_stages() {
        let candidates = vec![Entity::new("1", "Einstein", "Person")];
        let results = cascade_score(&candidates, "Einstein", 5);
        assert_eq!(results.len(), 1);
        assert!((results[0].1 - 1.0).abs() < f64::EPSILON);
    }
}
