//! Entity and relation search, with two interchangeable strategies
//! (component C5): [`basic::BasicSearch`] and
//! [`schema_guided::SchemaGuidedSearch`].

pub mod basic;
pub mod cascade;
pub mod engine;
pub mod schema_guided;

pub mod prelude {
    pub use crate::basic::BasicSearch;
    pub use crate::engine::SearchEngine;
    pub use crate::schema_guided::SchemaGuidedSearch;
}
