//! The embedding provider contract (spec.md §4.2, component C2).
//!
//! GraphMind never speaks a provider's wire protocol directly; it only
//! consumes this trait. Concrete HTTP/gRPC clients live outside this
//! workspace and are wired in by the embedding application.

use async_trait::async_trait;
use graphmind_core::error::Result;

/// A provider of text embeddings.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Unique provider identifier, used in diagnostics and cache namespacing.
    fn name(&self) -> &str;

    /// Embed a batch of texts, preserving input order.
    ///
    /// # Errors
    /// Returns [`graphmind_core::error::GraphMindError::Adapter`] if the
    /// provider is unreachable, rate-limited, or rejects the request.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Fixed dimensionality of vectors this provider returns.
    fn dimensions(&self) -> usize;

    /// Whether the provider currently accepts requests (spec.md's `available` contract).
    /// Adapters that have no meaningful health signal should default to `true`.
    async fn available(&self) -> bool {
        true
    }
}

/// Cosine similarity between two vectors, in `[-1.0, 1.0]`.
///
/// Returns `0.0` for mismatched or zero-length inputs rather than panicking,
/// since callers compare vectors sourced from caches that may hold stale
/// dimensionality after a provider swap.
#[must_use]
pub fn cosine(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_identical_vectors_is_one() {
        let v = vec![1.0_f32, 2.0, 3.0];
        assert!((cosine(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_orthogonal_vectors_is_zero() {
        let a = vec![1.0_f32, 0.0];
        let b = vec![0.0_f32, 1.0];
        assert!(cosine(&a, &b).abs() < 1e-9);
    }

    #[test]
    fn cosine_mismatched_lengths_is_zero() {
        let a = vec![1.0_f32, 2.0];
        let b = vec![1.0_f32];
        assert_eq!(cosine(&a, &b), 0.0);
    }
}
