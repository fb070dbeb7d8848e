//! The GraphMind engine facade: wires the schema inspector, search layer,
//! scheduler, reasoning pipeline and agent coordinator into a single
//! long-lived [`engine::Engine`], and exposes the session lifecycle
//! contract from spec.md §6.
//!
//! Every other GraphMind crate is a narrow capability; this crate is the
//! only one a caller that just wants to "ask a question" needs to import.

pub mod config;
pub mod engine;

pub mod prelude {
    pub use crate::config::{ConfigError, EngineConfig, SearchStrategyKind};
    pub use crate::engine::{Engine, SessionHandle};
}
