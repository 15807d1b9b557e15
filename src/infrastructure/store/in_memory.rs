//! In-memory key-value store backed by moka

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache as MokaCache;

use crate::domain::store::{glob_to_regex, KeyValueStore, MAX_STORE_TTL};
use crate::domain::DomainError;

/// Value stored in moka together with its own TTL
#[derive(Debug, Clone)]
struct StoredValue {
    data: Arc<str>,
    ttl: Duration,
}

/// Expires each entry after the TTL it was written with
struct PerEntryTtl;

impl Expiry<String, StoredValue> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &StoredValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Process-local store for single-node deployments and tests.
///
/// Capacity is a safety bound only; the query cache does its own LRU
/// accounting on top.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    cache: MokaCache<String, StoredValue>,
}

impl InMemoryStore {
    pub fn new(max_capacity: u64) -> Self {
        let cache = MokaCache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();

        Self { cache }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(100_000)
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        Ok(self.cache.get(key).await.map(|v| v.data.to_string()))
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        let stored = StoredValue {
            data: Arc::from(value),
            ttl: ttl.min(MAX_STORE_TTL),
        };

        self.cache.insert(key.to_string(), stored).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.cache.remove(key).await.is_some())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<usize, DomainError> {
        let regex = glob_to_regex(pattern)?;

        self.cache.run_pending_tasks().await;

        let keys: Vec<String> = self
            .cache
            .iter()
            .filter(|(k, _)| regex.is_match(k.as_str()))
            .map(|(k, _)| k.to_string())
            .collect();

        let mut deleted = 0;
        for key in keys {
            if self.cache.remove(&key).await.is_some() {
                deleted += 1;
            }
        }

        Ok(deleted)
    }

    async fn clear(&self) -> Result<(), DomainError> {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        Ok(())
    }

    async fn size(&self) -> Result<usize, DomainError> {
        self.cache.run_pending_tasks().await;
        Ok(self.cache.entry_count() as usize)
    }

    fn backend_name(&self) -> &'static str {
        "in_memory"
    }
}
