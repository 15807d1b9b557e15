//! Store factory for runtime backend selection

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::store::KeyValueStore;
use crate::domain::DomainError;

use super::in_memory::InMemoryStore;
use super::redis::RedisStore;

/// Supported store backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// Process-local moka cache
    #[default]
    InMemory,
    /// Shared Redis instance
    Redis,
}

impl std::fmt::Display for StoreType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreType::InMemory => write!(f, "in_memory"),
            StoreType::Redis => write!(f, "redis"),
        }
    }
}

impl std::str::FromStr for StoreType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "in_memory" | "inmemory" | "memory" => Ok(StoreType::InMemory),
            "redis" => Ok(StoreType::Redis),
            _ => Err(DomainError::configuration(format!(
                "Unknown store type: {}. Valid types: in_memory, redis",
                s
            ))),
        }
    }
}

/// Key-value store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub store_type: StoreType,

    /// Redis URL (required for the Redis backend)
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Prefix applied to every Redis key
    #[serde(default)]
    pub key_prefix: Option<String>,

    /// Hard entry bound for the in-memory backend
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
}

fn default_max_capacity() -> u64 {
    100_000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::InMemory,
            redis_url: None,
            key_prefix: None,
            max_capacity: default_max_capacity(),
        }
    }
}

impl StoreConfig {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn redis(url: impl Into<String>) -> Self {
        Self {
            store_type: StoreType::Redis,
            redis_url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = capacity;
        self
    }
}

/// Creates store instances from configuration
#[derive(Debug, Default)]
pub struct StoreFactory;

impl StoreFactory {
    pub fn new() -> Self {
        Self
    }

    pub async fn create(&self, config: &StoreConfig) -> Result<Arc<dyn KeyValueStore>, DomainError> {
        info!(store_type = %config.store_type, "Creating key-value store");

        match config.store_type {
            StoreType::InMemory => Ok(Arc::new(InMemoryStore::new(config.max_capacity))),
            StoreType::Redis => {
                let url = config.redis_url.as_deref().ok_or_else(|| {
                    DomainError::configuration("Redis URL is required for the redis store type")
                })?;

                let store = RedisStore::connect(url, config.key_prefix.clone()).await?;
                Ok(Arc::new(store))
            }
        }
    }
}
