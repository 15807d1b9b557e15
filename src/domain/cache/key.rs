//! Cache key generation

use serde_json::json;
use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of a JSON document
fn digest(value: &serde_json::Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// Key of the record holding a full [`CacheEntry`](super::CacheEntry), keyed by the raw query
pub fn entry_key(namespace: &str, query: &str, scope: Option<&str>) -> String {
    format!(
        "{}:entry:{}",
        namespace,
        digest(&json!({ "query": query, "scope": scope }))
    )
}

/// Key of the alias record pointing a normalized query at its entry key
pub fn alias_key(namespace: &str, normalized: &str, scope: Option<&str>) -> String {
    format!(
        "{}:norm:{}",
        namespace,
        digest(&json!({ "normalized": normalized, "scope": scope }))
    )
}

/// Pattern covering every key written under a namespace
pub fn namespace_pattern(namespace: &str) -> String {
    format!("{}:*", namespace)
}

/// Key for a cached embedding vector, stable across case and whitespace variants
pub fn embedding_key(prefix: &str, normalized: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    format!("{}:{}", prefix, hex::encode(hasher.finalize()))
}
