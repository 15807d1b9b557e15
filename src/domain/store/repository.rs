//! Key-value store trait definition

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::domain::DomainError;

/// Longest TTL a backend is asked to honour; larger values are clamped to it
pub const MAX_STORE_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

/// Shared key-value store backing the query and embedding caches
///
/// Values are JSON strings so the trait stays dyn-compatible; use
/// [`KeyValueStoreExt`] for typed access. Implementations must provide
/// per-key atomic get/set so concurrent writers are safe.
#[async_trait]
pub trait KeyValueStore: Send + Sync + Debug {
    /// Gets a raw JSON value
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// Sets a raw JSON value with a TTL
    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError>;

    /// Deletes a value, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool, DomainError>;

    /// Deletes all keys matching a glob-style pattern (`*` wildcard)
    async fn delete_pattern(&self, pattern: &str) -> Result<usize, DomainError>;

    /// Checks if a key exists
    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.get_raw(key).await?.is_some())
    }

    /// Clears every entry in the store
    async fn clear(&self) -> Result<(), DomainError>;

    /// Approximate number of entries
    async fn size(&self) -> Result<usize, DomainError>;

    /// Backend name for logs and metrics
    fn backend_name(&self) -> &'static str;
}

/// Typed get/set on top of [`KeyValueStore`]
pub trait KeyValueStoreExt: KeyValueStore {
    fn get<'a, V>(
        &'a self,
        key: &'a str,
    ) -> impl std::future::Future<Output = Result<Option<V>, DomainError>> + Send
    where
        V: DeserializeOwned + Send,
    {
        async move {
            match self.get_raw(key).await? {
                Some(data) => {
                    let value: V = serde_json::from_str(&data).map_err(|e| {
                        DomainError::cache(format!("Failed to deserialize value for '{}': {}", key, e))
                    })?;
                    Ok(Some(value))
                }
                None => Ok(None),
            }
        }
    }

    fn set<'a, V>(
        &'a self,
        key: &'a str,
        value: &'a V,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<(), DomainError>> + Send
    where
        V: Serialize + Send + Sync,
    {
        async move {
            let data = serde_json::to_string(value).map_err(|e| {
                DomainError::cache(format!("Failed to serialize value for '{}': {}", key, e))
            })?;
            self.set_raw(key, &data, ttl).await
        }
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStoreExt for T {}

/// Converts a `*` glob into an anchored regex
pub(crate) fn glob_to_regex(pattern: &str) -> Result<regex::Regex, DomainError> {
    let escaped = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");

    regex::Regex::new(&format!("^{}$", escaped))
        .map_err(|e| DomainError::cache(format!("Invalid pattern '{}': {}", pattern, e)))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_to_regex_is_anchored() {
        let regex = glob_to_regex("rag:query:*").unwrap();

        assert!(regex.is_match("rag:query:entry:abc"));
        assert!(!regex.is_match("other:rag:query:entry"));
    }

    #[test]
    fn test_glob_to_regex_escapes_metacharacters() {
        let regex = glob_to_regex("a.b*").unwrap();

        assert!(regex.is_match("a.bc"));
        assert!(!regex.is_match("axbc"));
    }
}
