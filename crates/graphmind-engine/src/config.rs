//! Engine-level configuration: [`graphmind_core::config::ReasoningConfig`]
//! plus the pool sizing and asset-path knobs that only make sense once a
//! whole engine (not just one session) is being wired up (spec.md §6,
//! SPEC_FULL.md §3.3).

use graphmind_core::config::ReasoningConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Which [`graphmind_search`] strategy the engine builds its search layer
/// from (spec.md §4.5: "pluggable between basic and schema-guided").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategyKind {
    Basic,
    SchemaGuided,
}

impl Default for SearchStrategyKind {
    fn default() -> Self {
        Self::SchemaGuided
    }
}

/// Errors raised while loading an [`EngineConfig`] from layered sources.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load engine configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Top-level configuration for one [`crate::engine::Engine`] instance.
///
/// Loadable via [`EngineConfig::load`], which layers defaults, an optional
/// `graphmind.toml` file and `GRAPHMIND_`-prefixed environment variables
/// (SPEC_FULL.md §3.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Per-session reasoning defaults; a caller may still override these
    /// per [`crate::engine::Engine::new_session_with_config`] call.
    pub reasoning: ReasoningConfig,
    /// Which search strategy backs every session created by this engine.
    pub search_strategy: SearchStrategyKind,
    /// Root directory holding `<name>.txt` prompt assets. `None` falls back
    /// to the built-in templates (spec.md §4.4).
    pub prompt_asset_dir: Option<PathBuf>,
    /// Schema cache validity window, seconds (spec.md §4.3 default: 5 minutes).
    pub schema_cache_ttl_secs: u64,
    /// How long [`crate::engine::Engine::shutdown`] waits for in-flight work
    /// to drain before hard-cancelling (spec.md §6).
    pub shutdown_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reasoning: ReasoningConfig::default(),
            search_strategy: SearchStrategyKind::default(),
            prompt_asset_dir: None,
            schema_cache_ttl_secs: 300,
            shutdown_timeout_ms: 5_000,
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub const fn schema_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.schema_cache_ttl_secs)
    }

    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Load layered configuration: built-in defaults, then an optional
    /// `graphmind.toml` in the current directory, then `GRAPHMIND_`-prefixed
    /// environment variables (e.g. `GRAPHMIND_REASONING__MAX_ENTITIES=50`).
    ///
    /// # Errors
    /// Returns [`ConfigError`] if a present `graphmind.toml` is malformed or
    /// an environment override fails to deserialize into the target shape.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let built = config::Config::builder()
            .add_source(config::Config::try_from(&defaults)?)
            .add_source(config::File::with_name("graphmind").required(false))
            .add_source(
                config::Environment::with_prefix("GRAPHMIND")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(built.try_deserialize()?)
    }
}
