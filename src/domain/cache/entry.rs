//! Cached query result entry

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A cached RAG result for one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Exact-tier key under which the entry is stored
    key: String,
    /// Query text as originally submitted
    query_text: String,
    /// `None` when embedding failed at write time; such entries never match semantically
    query_embedding: Option<Vec<f32>>,
    /// Documents that produced the result, de-duplicated, order preserved
    document_ids: Vec<String>,
    /// Opaque result payload
    result_payload: serde_json::Value,
    created_at: DateTime<Utc>,
    last_accessed_at: DateTime<Utc>,
    ttl_seconds: u64,
    #[serde(default)]
    hit_count: u32,
    /// Scoping metadata such as the model id
    #[serde(default)]
    scope: Option<String>,
}

impl CacheEntry {
    pub fn new(
        key: impl Into<String>,
        query_text: impl Into<String>,
        result_payload: serde_json::Value,
        document_ids: Vec<String>,
        ttl_seconds: u64,
        now: DateTime<Utc>,
    ) -> Self {
        let mut seen = std::collections::HashSet::new();
        let document_ids = document_ids
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect();

        Self {
            key: key.into(),
            query_text: query_text.into(),
            query_embedding: None,
            document_ids,
            result_payload,
            created_at: now,
            last_accessed_at: now,
            ttl_seconds,
            hit_count: 0,
            scope: None,
        }
    }

    pub fn with_embedding(mut self, embedding: Option<Vec<f32>>) -> Self {
        self.query_embedding = embedding.filter(|v| !v.is_empty());
        self
    }

    pub fn with_scope(mut self, scope: Option<String>) -> Self {
        self.scope = scope;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn query_text(&self) -> &str {
        &self.query_text
    }

    pub fn query_embedding(&self) -> Option<&[f32]> {
        self.query_embedding.as_deref()
    }

    pub fn document_ids(&self) -> &[String] {
        &self.document_ids
    }

    pub fn result_payload(&self) -> &serde_json::Value {
        &self.result_payload
    }

    pub fn into_payload(self) -> serde_json::Value {
        self.result_payload
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_accessed_at(&self) -> DateTime<Utc> {
        self.last_accessed_at
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    pub fn hit_count(&self) -> u32 {
        self.hit_count
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Age strictly greater than the TTL. A TTL too large for chrono never expires.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        i64::try_from(self.ttl_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .is_some_and(|ttl| now.signed_duration_since(self.created_at) > ttl)
    }

    /// Time left before expiry, zero once expired
    pub fn remaining_ttl(&self, now: DateTime<Utc>) -> std::time::Duration {
        let elapsed = now.signed_duration_since(self.created_at).num_seconds().max(0) as u64;
        std::time::Duration::from_secs(self.ttl_seconds.saturating_sub(elapsed))
    }

    /// Marks the entry as served
    pub fn record_hit(&mut self, now: DateTime<Utc>) {
        self.last_accessed_at = now;
        self.hit_count = self.hit_count.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn entry(ttl: u64) -> CacheEntry {
        CacheEntry::new(
            "ns:entry:abc",
            "What is X?",
            json!({"answer": "X"}),
            vec!["d1".into(), "d2".into(), "d1".into()],
            ttl,
            start(),
        )
    }

    #[test]
    fn test_document_ids_deduplicated_in_order() {
        assert_eq!(entry(60).document_ids(), ["d1", "d2"]);
    }

    #[test]
    fn test_expiry_boundary() {
        let entry = entry(60);

        assert!(!entry.is_expired(start() + Duration::seconds(60)));
        assert!(entry.is_expired(start() + Duration::seconds(61)));
    }

    #[test]
    fn test_unbounded_ttl_never_expires() {
        let entry = entry(u64::MAX);

        assert!(!entry.is_expired(start() + Duration::days(365 * 1000)));
        assert!(entry.remaining_ttl(start() + Duration::days(1)) > std::time::Duration::ZERO);
    }

    #[test]
    fn test_remaining_ttl() {
        let entry = entry(60);

        assert_eq!(
            entry.remaining_ttl(start() + Duration::seconds(20)),
            std::time::Duration::from_secs(40)
        );
        assert_eq!(
            entry.remaining_ttl(start() + Duration::seconds(120)),
            std::time::Duration::ZERO
        );
    }

    #[test]
    fn test_record_hit() {
        let mut entry = entry(60);
        let later = start() + Duration::seconds(5);

        entry.record_hit(later);

        assert_eq!(entry.last_accessed_at(), later);
        assert_eq!(entry.created_at(), start());
        assert_eq!(entry.hit_count(), 1);
    }

    #[test]
    fn test_empty_embedding_treated_as_missing() {
        let entry = entry(60).with_embedding(Some(vec![]));
        assert!(entry.query_embedding().is_none());
    }

    #[test]
    fn test_serde_round_trip_preserves_payload() {
        let entry = entry(60)
            .with_embedding(Some(vec![0.1, 0.2]))
            .with_scope(Some("llama3".into()));

        let json = serde_json::to_string(&entry).unwrap();
        let decoded: CacheEntry = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded, entry);
    }
}
