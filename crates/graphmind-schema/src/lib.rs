//! Schema inspection and search-strategy derivation (component C3).

pub mod inspector;
pub mod strategy;

pub mod prelude {
    pub use crate::inspector::SchemaInspector;
    pub use crate::strategy::derive_strategy;
}
