//! The LLM provider contract (spec.md §4.2, component C2).

use async_trait::async_trait;
use graphmind_core::error::Result;

/// Generation parameters threaded through to the underlying provider.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_tokens: 256,
        }
    }
}

/// A provider of text generation, used for prompt-driven reasoning steps
/// (entity extraction, path explanation, answer synthesis).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Unique provider identifier.
    fn name(&self) -> &str;

    /// Generate a completion for `prompt`.
    ///
    /// # Errors
    /// Returns [`graphmind_core::error::GraphMindError::Adapter`] on
    /// provider failure, classified transient/rate-limited/permanent so the
    /// scheduler can decide whether to retry.
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String>;

    /// Whether the provider currently accepts requests.
    async fn available(&self) -> bool {
        true
    }
}
