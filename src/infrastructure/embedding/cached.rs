//! Store-backed embedding cache

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::cache::key::embedding_key;
use crate::domain::store::{KeyValueStore, KeyValueStoreExt};
use crate::domain::{normalize, DomainError, EmbeddingProvider};
use crate::infrastructure::observability::record_embedding_cache;

const DEFAULT_KEY_PREFIX: &str = "emb:v1";
const DEFAULT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Hit/miss counters of a [`CachedEmbeddingProvider`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EmbeddingCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

/// Wraps an embedding provider with a key-value cache keyed by normalized text.
///
/// Case and whitespace variants share one vector. The store is best effort:
/// read or write failures fall through to the inner provider.
#[derive(Debug)]
pub struct CachedEmbeddingProvider {
    inner: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn KeyValueStore>,
    key_prefix: String,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CachedEmbeddingProvider {
    pub fn new(inner: Arc<dyn EmbeddingProvider>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            inner,
            store,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            ttl: DEFAULT_TTL,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn stats(&self) -> EmbeddingCacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        EmbeddingCacheStats {
            hits,
            misses,
            hit_rate: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            },
        }
    }

    /// Removes every cached vector under this provider's prefix
    pub async fn clear(&self) -> Result<usize, DomainError> {
        self.store
            .delete_pattern(&format!("{}:*", self.key_prefix))
            .await
    }

    fn key(&self, text: &str) -> String {
        embedding_key(&self.key_prefix, &normalize(text))
    }
}

#[async_trait]
impl EmbeddingProvider for CachedEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        let key = self.key(text);

        match self.store.get::<Vec<f32>>(&key).await {
            Ok(Some(vector)) if !vector.is_empty() => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                record_embedding_cache(true);
                debug!(key = %key, "Embedding cache hit");
                return Ok(vector);
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Embedding cache read failed"),
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        record_embedding_cache(false);

        let vector = self.inner.embed(text).await?;

        if let Err(e) = self.store.set(&key, &vector, self.ttl).await {
            warn!(error = %e, "Embedding cache write failed");
        }

        Ok(vector)
    }

    fn dimensions(&self) -> Option<usize> {
        self.inner.dimensions()
    }

    fn provider_name(&self) -> &'static str {
        self.inner.provider_name()
    }
}
