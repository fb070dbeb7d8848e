//! Multi-agent task coordinator (spec.md §4.11, component C11).
//!
//! Agents are stateless wrappers over other components (C1, C5) registered
//! under a unique id. The coordinator does no reasoning of its own — it only
//! picks a ready, capable agent and measures how long it took.

pub mod coordinator;
pub mod entity_search;
pub mod relationship_analysis;

pub mod prelude {
    pub use crate::coordinator::{Agent, AgentResult, AgentState, Coordinator, TaskRequest};
    pub use crate::entity_search::EntitySearchAgent;
    pub use crate::relationship_analysis::RelationshipAnalysisAgent;
}
