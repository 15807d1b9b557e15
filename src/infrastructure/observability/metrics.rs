//! Metric recording helpers
//!
//! Values go to whatever `metrics` recorder the host process installs;
//! without one they are no-ops.

use std::time::Duration;

use metrics::{counter, gauge, histogram};

use crate::domain::cache::{CacheTier, MissReason};
use crate::domain::query::{ClassificationSource, QueryType};

/// Record the outcome of one cache lookup
pub fn record_cache_lookup(tier: Option<CacheTier>, miss_reason: Option<MissReason>) {
    let (tier, outcome) = match (tier, miss_reason) {
        (Some(tier), _) => (tier.as_str(), "hit"),
        (None, Some(reason)) => ("none", miss_reason_label(reason)),
        (None, None) => ("none", "miss"),
    };

    counter!("rag_cache_lookups_total", "tier" => tier, "outcome" => outcome).increment(1);
}

/// Record an LRU eviction
pub fn record_cache_eviction() {
    counter!("rag_cache_evictions_total").increment(1);
}

/// Record the locally tracked cache size
pub fn record_cache_size(size: usize) {
    gauge!("rag_cache_entries").set(size as f64);
}

/// Record an LLM call
pub fn record_llm_request(params: LlmRequestMetricParams) {
    let labels = [
        ("backend", params.backend.to_string()),
        ("operation", params.operation.to_string()),
        ("status", if params.success { "success" } else { "error" }.to_string()),
    ];

    counter!("rag_llm_requests_total", &labels).increment(1);
    histogram!("rag_llm_request_duration_seconds", &labels).record(params.duration.as_secs_f64());
}

/// Parameters for LLM request metrics
pub struct LlmRequestMetricParams<'a> {
    pub backend: &'a str,
    pub operation: &'a str,
    pub duration: Duration,
    pub success: bool,
}

/// Record a query classification
pub fn record_classification(query_type: QueryType, source: ClassificationSource) {
    counter!(
        "rag_query_classifications_total",
        "query_type" => query_type.as_str(),
        "source" => source_label(source)
    )
    .increment(1);
}

/// Record an L4 embedding cache lookup
pub fn record_embedding_cache(hit: bool) {
    let outcome = if hit { "hit" } else { "miss" };
    counter!("rag_embedding_cache_lookups_total", "outcome" => outcome).increment(1);
}

fn miss_reason_label(reason: MissReason) -> &'static str {
    match reason {
        MissReason::Disabled => "disabled",
        MissReason::NotFound => "not_found",
        MissReason::Expired => "expired",
        MissReason::BelowThreshold => "below_threshold",
        MissReason::ValidationMismatch => "validation_mismatch",
        MissReason::StoreUnavailable => "store_unavailable",
    }
}

fn source_label(source: ClassificationSource) -> &'static str {
    match source {
        ClassificationSource::Llm => "llm",
        ClassificationSource::Heuristic => "heuristic",
        ClassificationSource::Fallback => "fallback",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_miss_reason_labels() {
        assert_eq!(
            miss_reason_label(MissReason::ValidationMismatch),
            "validation_mismatch"
        );
        assert_eq!(miss_reason_label(MissReason::Expired), "expired");
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_cache_lookup(Some(CacheTier::Exact), None);
        record_cache_lookup(None, Some(MissReason::NotFound));
        record_cache_eviction();
        record_cache_size(3);
        record_classification(QueryType::Factual, ClassificationSource::Llm);
        record_embedding_cache(true);
        record_llm_request(LlmRequestMetricParams {
            backend: "ollama",
            operation: "generate",
            duration: Duration::from_millis(5),
            success: true,
        });
    }
}
