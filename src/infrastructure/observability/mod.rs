//! Observability infrastructure - Metrics

mod metrics;

pub use metrics::{
    record_cache_eviction, record_cache_lookup, record_cache_size, record_classification,
    record_embedding_cache, record_llm_request, LlmRequestMetricParams,
};
