//! Cache statistics and lookup results

use serde::{Deserialize, Serialize};

use super::CacheEntry;

/// Tier that served a cache hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheTier {
    Exact,
    Normalized,
    Semantic,
}

impl CacheTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheTier::Exact => "exact",
            CacheTier::Normalized => "normalized",
            CacheTier::Semantic => "semantic",
        }
    }
}

/// Why a lookup produced no entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissReason {
    /// Caching is turned off
    Disabled,
    /// No tier had a candidate
    NotFound,
    /// A candidate existed but was past its TTL
    Expired,
    /// Best semantic candidate was under the similarity threshold
    BelowThreshold,
    /// Semantic candidate failed the document overlap gate
    ValidationMismatch,
    /// The backing store failed
    StoreUnavailable,
}

/// Full result of a lookup
#[derive(Debug, Clone, Default)]
pub struct CacheLookup {
    pub entry: Option<CacheEntry>,
    pub tier: Option<CacheTier>,
    pub miss_reason: Option<MissReason>,
    /// Embedding computed by the semantic tier, reusable for the follow-up `put`
    pub query_embedding: Option<Vec<f32>>,
}

impl CacheLookup {
    pub fn hit(entry: CacheEntry, tier: CacheTier) -> Self {
        Self {
            entry: Some(entry),
            tier: Some(tier),
            miss_reason: None,
            query_embedding: None,
        }
    }

    pub fn miss(reason: MissReason) -> Self {
        Self {
            miss_reason: Some(reason),
            ..Self::default()
        }
    }

    pub fn with_query_embedding(mut self, embedding: Option<Vec<f32>>) -> Self {
        self.query_embedding = embedding;
        self
    }

    pub fn is_hit(&self) -> bool {
        self.entry.is_some()
    }
}

/// Counters exposed by the query cache
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_queries: u64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub exact_hits: u64,
    pub normalized_hits: u64,
    pub semantic_hits: u64,
    /// Semantic candidates above the similarity threshold rejected by the overlap gate
    pub semantic_rejections: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub store_errors: u64,
    pub size: usize,
    pub max_cache_size: usize,
}

impl CacheStats {
    pub fn calculate_hit_rate(hits: u64, total: u64) -> f64 {
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        assert_eq!(CacheStats::calculate_hit_rate(0, 0), 0.0);
        assert!((CacheStats::calculate_hit_rate(3, 4) - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_lookup_constructors() {
        let miss = CacheLookup::miss(MissReason::ValidationMismatch)
            .with_query_embedding(Some(vec![1.0]));

        assert!(!miss.is_hit());
        assert_eq!(miss.miss_reason, Some(MissReason::ValidationMismatch));
        assert_eq!(miss.query_embedding, Some(vec![1.0]));
    }

    #[test]
    fn test_tier_labels() {
        assert_eq!(CacheTier::Exact.as_str(), "exact");
        assert_eq!(CacheTier::Normalized.as_str(), "normalized");
        assert_eq!(CacheTier::Semantic.as_str(), "semantic");
    }
}
