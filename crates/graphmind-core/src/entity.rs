//! Entities and relations: the read-only graph data model (spec.md §3).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A node in the knowledge graph.
///
/// Entities are immutable within a reasoning session: the graph store owns
/// them and the core treats every instance it receives as a borrowed,
/// read-only snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entity {
    /// Opaque identifier, unique within the graph store.
    pub id: String,

    /// Human-readable display name.
    pub name: String,

    /// Type label (e.g. "Person", "Location").
    pub entity_type: String,

    /// Arbitrary property bag.
    pub properties: HashMap<String, Value>,
}

impl Entity {
    /// Create a new entity.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            entity_type: entity_type.into(),
            properties: HashMap::new(),
        }
    }

    /// Builder-style property insertion.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Fetch a property value as a plain string, if present and string-typed.
    #[must_use]
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }
}

/// A directed, typed edge between two entities.
///
/// Relations are immutable and, like entities, owned by the graph store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Relation {
    /// Source entity id.
    pub source_id: String,

    /// Target entity id.
    pub target_id: String,

    /// Relationship type label (e.g. "WORKED_AT").
    pub relation_type: String,

    /// Optional property bag.
    pub properties: HashMap<String, Value>,
}

impl Relation {
    /// Create a new relation.
    #[must_use]
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        relation_type: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            relation_type: relation_type.into(),
            properties: HashMap::new(),
        }
    }

    /// Builder-style property insertion.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Return the endpoint id that is not `from`, if `from` is one of the two endpoints.
    ///
    /// Used by the traversal engine to resolve "the other side" of an edge
    /// without assuming a traversal direction.
    #[must_use]
    pub fn other_endpoint(&self, from: &str) -> Option<&str> {
        if self.source_id == from {
            Some(&self.target_id)
        } else if self.target_id == from {
            Some(&self.source_id)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_endpoint_resolves_either_direction() {
        let r = Relation::new("a", "b", "KNOWS");
        assert_eq!(r.other_endpoint("a"), Some("b"));
        assert_eq!(r.other_endpoint("b"), Some("a"));
        assert_eq!(r.other_endpoint("c"), None);
    }

    #[test]
    fn entity_property_str_reads_through() {
        let e = Entity::new("1", "Einstein", "Person")
            .with_property("nationality", Value::String("German".into()));
        assert_eq!(e.property_str("nationality"), Some("German"));
        assert_eq!(e.property_str("missing"), None);
    }
}
