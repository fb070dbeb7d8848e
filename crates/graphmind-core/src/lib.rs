//! Core data model, error taxonomy and capability traits shared by every
//! GraphMind crate.
//!
//! This crate has no knowledge of any concrete graph database, embedding
//! provider or LLM — it defines the traits ([`store::GraphStore`]) and
//! value types ([`entity::Entity`], [`result::ReasoningPath`], ...) that the
//! rest of the workspace builds on.

pub mod config;
pub mod entity;
pub mod error;
pub mod result;
pub mod schema;
pub mod store;
pub mod task;

#[cfg(any(test, feature = "test-util"))]
pub mod memory_store;

pub mod prelude {
    //! Convenience re-exports for downstream crates.
    pub use crate::config::{
        EvidenceThresholds, PathScoreWeights, RankingWeights, ReasoningConfig, TraversalStopConfig,
    };
    pub use crate::entity::{Entity, Relation};
    pub use crate::error::{AdapterErrorKind, GraphMindError, Result};
    pub use crate::result::{MultiHopResult, ReasoningPath, ReasoningResult, ReasoningStep};
    pub use crate::schema::{GraphSchema, NodeTypeInfo, RelationshipTypeInfo, SearchStrategy};
    pub use crate::store::{GraphStore, QueryRow};
    pub use crate::task::{Task, TaskKind, TaskState};
}
