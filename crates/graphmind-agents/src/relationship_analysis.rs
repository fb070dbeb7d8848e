//! `RelationshipAnalysisAgent`: wraps C1's relation/entity lookups for
//! summarization, path discovery and connectivity queries (spec.md §4.11).

use crate::coordinator::{Agent, AgentResult, AgentState};
use async_trait::async_trait;
use graphmind_core::store::GraphStore;
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

const DEFAULT_MAX_DEPTH: u32 = 3;
const PATH_FINDING_LIMIT: usize = 5;

/// Handles `relationship_analysis`, `path_finding`, `connection_discovery`,
/// and `relation_summary`.
pub struct RelationshipAnalysisAgent<S> {
    id: String,
    store: Arc<S>,
}

impl<S: GraphStore> RelationshipAnalysisAgent<S> {
    #[must_use]
    pub fn new(id: impl Into<String>, store: Arc<S>) -> Self {
        Self { id: id.into(), store }
    }

    fn max_depth_from(context: &HashMap<String, Value>) -> u32 {
        context
            .get("max_depth")
            .and_then(Value::as_u64)
            .map_or(DEFAULT_MAX_DEPTH, |v| v as u32)
    }

    fn string_from(context: &HashMap<String, Value>, key: &str) -> Option<String> {
        context.get(key).and_then(Value::as_str).map(str::to_string)
    }

    /// Group `entity_id`'s incident relations by type and name the neighbor
    /// on the other end of each.
    async fn relationship_analysis(&self, entity_id: &str) -> AgentResult {
        let relations = match self.store.entity_relations(entity_id).await {
            Ok(r) => r,
            Err(e) => return AgentResult::failure(e.to_string()),
        };

        let mut by_type: HashMap<String, Vec<String>> = HashMap::new();
        for relation in &relations {
            let Some(other_id) = relation.other_endpoint(entity_id) else {
                continue;
            };
            let neighbor_name = match self.store.find_entity(other_id).await {
                Ok(Some(entity)) => entity.name,
                _ => other_id.to_string(),
            };
            by_type.entry(relation.relation_type.clone()).or_default().push(neighbor_name);
        }

        let mut summary_lines = Vec::new();
        let mut metadata = HashMap::new();
        let mut by_type_sorted: Vec<(&String, &Vec<String>)> = by_type.iter().collect();
        by_type_sorted.sort_by_key(|(relation_type, _)| relation_type.as_str());
        for (relation_type, neighbors) in by_type_sorted {
            summary_lines.push(format!("{relation_type}: {}", neighbors.join(", ")));
        }
        metadata.insert(
            "by_type".to_string(),
            Value::Object(
                by_type
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        );
        metadata.insert("relation_count".to_string(), Value::from(relations.len()));

        if summary_lines.is_empty() {
            AgentResult::success(format!("{entity_id} has no recorded relations"), metadata)
        } else {
            AgentResult::success(summary_lines.join("; "), metadata)
        }
    }

    /// Enumerate up to [`PATH_FINDING_LIMIT`] distinct simple paths from
    /// `from_id` to `to_id`, bounded to `max_depth` hops, via depth-first
    /// search over a visited set scoped to the current path.
    async fn path_finding(&self, from_id: &str, to_id: &str, max_depth: u32) -> AgentResult {
        let mut found: Vec<Vec<String>> = Vec::new();
        let mut stack: Vec<(String, Vec<String>, HashSet<String>)> =
            vec![(from_id.to_string(), vec![from_id.to_string()], HashSet::from([from_id.to_string()]))];

        while let Some((current, path, visited)) = stack.pop() {
            if found.len() >= PATH_FINDING_LIMIT {
                break;
            }
            if current == to_id && path.len() > 1 {
                found.push(path);
                continue;
            }
            if u32::try_from(path.len()).unwrap_or(u32::MAX) > max_depth {
                continue;
            }
            let relations = match self.store.entity_relations(&current).await {
                Ok(r) => r,
                Err(_) => continue,
            };
            for relation in relations {
                let Some(next) = relation.other_endpoint(&current) else {
                    continue;
                };
                if visited.contains(next) {
                    continue;
                }
                let mut next_path = path.clone();
                next_path.push(next.to_string());
                let mut next_visited = visited.clone();
                next_visited.insert(next.to_string());
                stack.push((next.to_string(), next_path, next_visited));
            }
        }

        let mut metadata = HashMap::new();
        metadata.insert(
            "paths".to_string(),
            Value::Array(found.iter().map(|p| Value::from(p.clone())).collect()),
        );
        metadata.insert("count".to_string(), Value::from(found.len()));
        let result = found
            .iter()
            .map(|p| p.join(" -> "))
            .collect::<Vec<_>>()
            .join(" | ");
        AgentResult::success(result, metadata)
    }

    /// Bounded BFS from `entity_id` recording the minimum depth at which
    /// every reachable entity was first seen.
    async fn connection_discovery(&self, entity_id: &str, max_depth: u32) -> AgentResult {
        let mut depths: HashMap<String, u32> = HashMap::from([(entity_id.to_string(), 0)]);
        let mut queue: VecDeque<(String, u32)> = VecDeque::from([(entity_id.to_string(), 0)]);

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            let Ok(relations) = self.store.entity_relations(&current).await else {
                continue;
            };
            for relation in relations {
                let Some(next) = relation.other_endpoint(&current) else {
                    continue;
                };
                if depths.contains_key(next) {
                    continue;
                }
                depths.insert(next.to_string(), depth + 1);
                queue.push_back((next.to_string(), depth + 1));
            }
        }
        depths.remove(entity_id);

        let mut entries: Vec<(String, u32)> = depths.into_iter().collect();
        entries.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

        let mut metadata = HashMap::new();
        metadata.insert(
            "reachable".to_string(),
            Value::Object(
                entries
                    .iter()
                    .map(|(id, depth)| (id.clone(), Value::from(*depth)))
                    .collect(),
            ),
        );
        metadata.insert("count".to_string(), Value::from(entries.len()));
        let result = entries
            .iter()
            .map(|(id, depth)| format!("{id}@{depth}"))
            .collect::<Vec<_>>()
            .join(", ");
        AgentResult::success(result, metadata)
    }

    /// Global per-type relation counts across the whole store.
    async fn relation_summary(&self) -> AgentResult {
        let types = match self.store.all_relationship_types().await {
            Ok(t) => t,
            Err(e) => return AgentResult::failure(e.to_string()),
        };

        let mut metadata = HashMap::new();
        let mut counts = HashMap::new();
        let mut lines = Vec::new();
        for relation_type in types {
            let count = self.store.relationship_count(&relation_type).await.unwrap_or(0);
            lines.push(format!("{relation_type}: {count}"));
            counts.insert(relation_type, Value::from(count));
        }
        metadata.insert("counts".to_string(), Value::Object(counts.into_iter().collect()));
        AgentResult::success(lines.join(", "), metadata)
    }
}

#[async_trait]
impl<S: GraphStore> Agent for RelationshipAnalysisAgent<S> {
    fn id(&self) -> &str {
        &self.id
    }

    fn state(&self) -> AgentState {
        AgentState::Ready
    }

    fn can_handle(&self, kind: &str, _description: &str) -> bool {
        matches!(
            kind,
            "relationship_analysis" | "path_finding" | "connection_discovery" | "relation_summary"
        )
    }

    async fn execute(
        &self,
        kind: &str,
        description: &str,
        context: &HashMap<String, Value>,
    ) -> AgentResult {
        let max_depth = Self::max_depth_from(context);
        match kind {
            "relationship_analysis" => {
                let Some(entity_id) = Self::string_from(context, "entity_id") else {
                    return AgentResult::failure("relationship_analysis requires context.entity_id");
                };
                self.relationship_analysis(&entity_id).await
            }
            "path_finding" => {
                let (Some(from_id), Some(to_id)) =
                    (Self::string_from(context, "from_id"), Self::string_from(context, "to_id"))
                else {
                    return AgentResult::failure("path_finding requires context.from_id and context.to_id");
                };
                self.path_finding(&from_id, &to_id, max_depth).await
            }
            "connection_discovery" => {
                let Some(entity_id) = Self::string_from(context, "entity_id") else {
                    return AgentResult::failure("connection_discovery requires context.entity_id");
                };
                self.connection_discovery(&entity_id, max_depth).await
            }
            "relation_summary" => self.relation_summary().await,
            other => AgentResult::failure(format!(
                "unsupported kind for RelationshipAnalysisAgent: {other} ({description})"
            )),
        }
    }
}
