//! Deterministic stub providers for tests, behind the `test-util` feature.
//!
//! These do not attempt to approximate a real model; they exist so the
//! reasoning pipeline can be exercised end-to-end without network access.

use crate::embedding::EmbeddingProvider;
use crate::llm::{GenerationParams, LlmProvider};
use async_trait::async_trait;
use graphmind_core::error::Result;
use std::sync::atomic::{AtomicU64, Ordering};

/// Produces a deterministic embedding from a text's byte sum, so that equal
/// texts always embed identically and distinct texts (almost always) don't.
pub struct StubEmbeddingProvider {
    dimensions: usize,
    calls: AtomicU64,
    unavailable: bool,
}

impl StubEmbeddingProvider {
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            calls: AtomicU64::new(0),
            unavailable: false,
        }
    }

    #[must_use]
    pub fn unavailable(dimensions: usize) -> Self {
        Self {
            dimensions,
            calls: AtomicU64::new(0),
            unavailable: true,
        }
    }

    #[must_use]
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut seed: u64 = 1469598103934665603;
        for byte in text.bytes() {
            seed ^= u64::from(byte);
            seed = seed.wrapping_mul(1099511628211);
        }
        (0..self.dimensions)
            .map(|i| {
                let mixed = seed.wrapping_add(i as u64).wrapping_mul(2654435761);
                (mixed % 2000) as f32 / 1000.0 - 1.0
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbeddingProvider {
    fn name(&self) -> &str {
        "stub"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if self.unavailable {
            return Err(graphmind_core::error::GraphMindError::transient(
                "stub embedding provider unavailable",
            ));
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn available(&self) -> bool {
        !self.unavailable
    }
}

/// Echoes a canned response, or the prompt itself when no canned value is set.
pub struct StubLlmProvider {
    canned: Option<String>,
    unavailable: bool,
}

impl StubLlmProvider {
    #[must_use]
    pub fn new(canned: impl Into<String>) -> Self {
        Self {
            canned: Some(canned.into()),
            unavailable: false,
        }
    }

    #[must_use]
    pub fn echo() -> Self {
        Self {
            canned: None,
            unavailable: false,
        }
    }

    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            canned: None,
            unavailable: true,
        }
    }
}

#[async_trait]
impl LlmProvider for StubLlmProvider {
    fn name(&self) -> &str {
        "stub"
    }

    async fn generate(&self, prompt: &str, _params: &GenerationParams) -> Result<String> {
        if self.unavailable {
            return Err(graphmind_core::error::GraphMindError::transient(
                "stub llm provider unavailable",
            ));
        }
        Ok(self.canned.clone().unwrap_or_else(|| prompt.to_string()))
    }

    async fn available(&self) -> bool {
        !self.unavailable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_embedding_is_deterministic() {
        let provider = StubEmbeddingProvider::new(8);
        let a = provider.embed(&["hello".to_string()]).await.unwrap();
        let b = provider.embed(&["hello".to_string()]).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn stub_llm_echoes_canned_response() {
        let provider = StubLlmProvider::new("42");
        let out = provider
            .generate("what is the answer", &GenerationParams::default())
            .await
            .unwrap();
        assert_eq!(out, "42");
    }
}
