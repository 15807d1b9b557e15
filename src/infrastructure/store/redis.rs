//! Redis key-value store

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use crate::domain::store::{KeyValueStore, MAX_STORE_TTL};
use crate::domain::DomainError;

const SCAN_BATCH: usize = 100;

/// Shared store for multi-instance deployments.
///
/// Keys are written with `SET EX`, so Redis enforces the TTL itself.
/// Pattern deletes use `SCAN` rather than `KEYS`.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    key_prefix: Option<String>,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("key_prefix", &self.key_prefix)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisStore {
    pub async fn connect(url: &str, key_prefix: Option<String>) -> Result<Self, DomainError> {
        let client = Client::open(url)
            .map_err(|e| DomainError::cache(format!("Failed to create Redis client: {}", e)))?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self {
            connection,
            key_prefix,
        })
    }

    fn prefix_key(&self, key: &str) -> String {
        prefixed(self.key_prefix.as_deref(), key)
    }

    /// Visits every key matching `pattern` in SCAN batches
    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, DomainError> {
        let mut conn = self.connection.clone();
        let mut cursor = 0u64;
        let mut found = Vec::new();

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(|e| {
                    DomainError::cache(format!("Failed to scan keys with pattern '{}': {}", pattern, e))
                })?;

            found.extend(keys);
            cursor = next;

            if cursor == 0 {
                break;
            }
        }

        Ok(found)
    }
}

fn prefixed(prefix: Option<&str>, key: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}:{}", prefix, key),
        None => key.to_string(),
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        let mut conn = self.connection.clone();

        conn.get(self.prefix_key(key))
            .await
            .map_err(|e| DomainError::cache(format!("Failed to get key '{}': {}", key, e)))
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        let mut conn = self.connection.clone();
        let ttl_secs = ttl.min(MAX_STORE_TTL).as_secs().max(1);

        conn.set_ex::<_, _, ()>(self.prefix_key(key), value, ttl_secs)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to set key '{}': {}", key, e)))
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let mut conn = self.connection.clone();

        let deleted: i64 = conn
            .del(self.prefix_key(key))
            .await
            .map_err(|e| DomainError::cache(format!("Failed to delete key '{}': {}", key, e)))?;

        Ok(deleted > 0)
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<usize, DomainError> {
        let keys = self.scan_keys(&self.prefix_key(pattern)).await?;
        let mut conn = self.connection.clone();
        let mut total_deleted = 0usize;

        for batch in keys.chunks(SCAN_BATCH) {
            let deleted: i64 = conn
                .del(batch)
                .await
                .map_err(|e| DomainError::cache(format!("Failed to delete keys: {}", e)))?;
            total_deleted += deleted as usize;
        }

        Ok(total_deleted)
    }

    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        let mut conn = self.connection.clone();

        conn.exists(self.prefix_key(key)).await.map_err(|e| {
            DomainError::cache(format!("Failed to check existence of key '{}': {}", key, e))
        })
    }

    async fn clear(&self) -> Result<(), DomainError> {
        // Without a prefix the whole logical database belongs to us
        match self.key_prefix {
            Some(_) => {
                self.delete_pattern("*").await?;
            }
            None => {
                let mut conn = self.connection.clone();
                redis::cmd("FLUSHDB")
                    .query_async::<()>(&mut conn)
                    .await
                    .map_err(|e| DomainError::cache(format!("Failed to flush database: {}", e)))?;
            }
        }

        Ok(())
    }

    async fn size(&self) -> Result<usize, DomainError> {
        if self.key_prefix.is_some() {
            return Ok(self.scan_keys(&self.prefix_key("*")).await?.len());
        }

        let mut conn = self.connection.clone();
        redis::cmd("DBSIZE")
            .query_async(&mut conn)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to get database size: {}", e)))
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::store::KeyValueStoreExt;

    #[test]
    fn test_prefixed() {
        assert_eq!(prefixed(Some("app"), "rag:entry:1"), "app:rag:entry:1");
        assert_eq!(prefixed(None, "rag:entry:1"), "rag:entry:1");
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_round_trip() {
        let store = RedisStore::connect("redis://127.0.0.1:6379", Some("rag-test".into()))
            .await
            .unwrap();

        store.set("key", &"value", Duration::from_secs(60)).await.unwrap();
        let value: Option<String> = store.get("key").await.unwrap();
        assert_eq!(value, Some("value".to_string()));

        store.clear().await.unwrap();
        assert_eq!(store.size().await.unwrap(), 0);
    }
}
