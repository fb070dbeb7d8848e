//! Named prompt template registry (component C4).

pub mod registry;

pub mod prelude {
    pub use crate::registry::PromptRegistry;
}
