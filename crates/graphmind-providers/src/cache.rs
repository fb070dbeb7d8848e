//! Content-hashed LRU embedding cache wrapping an [`EmbeddingProvider`].
//!
//! SHA-256 content hashing for cache keys plus a `parking_lot`-guarded
//! `lru::LruCache`. This cache also single-flights concurrent misses on
//! the same text so a burst of identical questions only pays for one
//! provider call (spec.md §4.2, §5).

use crate::embedding::EmbeddingProvider;
use async_trait::async_trait;
use graphmind_core::error::Result;
use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

#[derive(Debug, Default, Clone, Copy)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

enum InFlight {
    Done(Vec<f32>),
    Pending(broadcast::Sender<Vec<f32>>),
}

/// An [`EmbeddingProvider`] wrapper that caches embeddings by content hash.
pub struct CachedEmbeddingProvider<P> {
    inner: Arc<P>,
    cache: Mutex<LruCache<String, Vec<f32>>>,
    inflight: Mutex<HashMap<String, InFlight>>,
    stats: Mutex<CacheStats>,
}

impl<P: EmbeddingProvider> CachedEmbeddingProvider<P> {
    /// Wrap `inner`, caching up to `capacity` distinct texts.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(inner: Arc<P>, capacity: usize) -> Self {
        Self {
            inner,
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).expect("embedding cache capacity must be non-zero"),
            )),
            inflight: Mutex::new(HashMap::new()),
            stats: Mutex::new(CacheStats::default()),
        }
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        *self.stats.lock()
    }

    fn hash(text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Embed one text, serving from cache when possible and single-flighting
    /// concurrent misses for the same content hash.
    ///
    /// # Errors
    /// Propagates the inner provider's error on a cache miss.
    pub async fn embed_single(&self, text: &str) -> Result<Vec<f32>> {
        let key = Self::hash(text);

        if let Some(v) = self.cache.lock().get(&key).cloned() {
            self.stats.lock().hits += 1;
            debug!(hash = %&key[..8], "embedding cache hit");
            return Ok(v);
        }

        let mut rx = {
            let mut inflight = self.inflight.lock();
            match inflight.get(&key) {
                Some(InFlight::Pending(tx)) => Some(tx.subscribe()),
                Some(InFlight::Done(_)) | None => {
                    let (tx, _rx) = broadcast::channel(1);
                    inflight.insert(key.clone(), InFlight::Pending(tx));
                    None
                }
            }
        };

        if let Some(rx) = rx.take() {
            self.stats.lock().misses += 1;
            let mut rx = rx;
            return rx
                .recv()
                .await
                .map_err(|_| graphmind_core::error::GraphMindError::transient(
                    "embedding computation in flight was dropped",
                ));
        }

        self.stats.lock().misses += 1;
        let result = self.inner.embed(std::slice::from_ref(&text.to_string())).await;

        let mut inflight = self.inflight.lock();
        let slot = inflight.remove(&key);
        match &result {
            Ok(vectors) => {
                let embedding = vectors.first().cloned().unwrap_or_default();
                self.cache.lock().put(key, embedding.clone());
                if let Some(InFlight::Pending(tx)) = slot {
                    let _ = tx.send(embedding.clone());
                }
                Ok(embedding)
            }
            Err(e) => {
                // Drop the pending slot without broadcasting; waiters will
                // observe a closed channel and surface their own error.
                drop(slot);
                Err(clone_err(e))
            }
        }
    }

    /// Embed a batch, checking the cache per-text and generating only the misses.
    ///
    /// # Errors
    /// Propagates the inner provider's error if any uncached text fails.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        let mut to_generate = Vec::new();
        let mut to_generate_indices = Vec::new();

        {
            let mut cache = self.cache.lock();
            for (i, text) in texts.iter().enumerate() {
                let key = Self::hash(text);
                if let Some(v) = cache.get(&key) {
                    results[i] = Some(v.clone());
                } else {
                    to_generate.push(text.clone());
                    to_generate_indices.push((i, key));
                }
            }
        }
        let mut stats = self.stats.lock();
        stats.hits += (texts.len() - to_generate.len()) as u64;
        stats.misses += to_generate.len() as u64;
        drop(stats);

        if !to_generate.is_empty() {
            let generated = self.inner.embed(&to_generate).await?;
            let mut cache = self.cache.lock();
            for ((idx, key), embedding) in to_generate_indices.into_iter().zip(generated) {
                cache.put(key, embedding.clone());
                results[idx] = Some(embedding);
            }
        }

        Ok(results.into_iter().map(Option::unwrap_or_default).collect())
    }
}

fn clone_err(e: &graphmind_core::error::GraphMindError) -> graphmind_core::error::GraphMindError {
    graphmind_core::error::GraphMindError::Internal(e.to_string())
}

#[async_trait]
impl<P: EmbeddingProvider> EmbeddingProvider for CachedEmbeddingProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.embed_batch(texts).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    async fn available(&self) -> bool {
        self.inner.available().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::StubEmbeddingProvider;

    #[tokio::test]
    async fn repeated_text_is_served_from_cache() {
        let stub = Arc::new(StubEmbeddingProvider::new(4));
        let cached = CachedEmbeddingProvider::new(stub.clone(), 16);

        let first = cached.embed_single("hello world").await.unwrap();
        let second = cached.embed_single("hello world").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(cached.stats().hits, 1);
        assert_eq!(cached.stats().misses, 1);
        assert_eq!(stub.call_count(), 1);
    }

    #[tokio::test]
    async fn batch_only_generates_misses() {
        let stub = Arc::new(StubEmbeddingProvider::new(4));
        let cached = CachedEmbeddingProvider::new(stub.clone(), 16);

        cached.embed_single("a").await.unwrap();
        let batch = cached
            .embed_batch(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(cached.stats().hits, 1);
        assert_eq!(cached.stats().misses, 2);
    }
}
