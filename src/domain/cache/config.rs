//! Query cache configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the multi-stage query cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryCacheConfig {
    /// Whether caching is enabled at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Namespace prefix for every key the cache writes
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Scoping metadata mixed into every key (e.g. the generation model id)
    #[serde(default)]
    pub scope: Option<String>,

    /// Maximum number of entries before LRU eviction
    #[serde(default = "default_max_cache_size")]
    pub max_cache_size: usize,

    /// Time-to-live for entries in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Whether the semantic tier runs when an embedding provider is configured
    #[serde(default = "default_true")]
    pub enable_semantic: bool,

    /// Minimum cosine similarity for a provisional semantic match.
    /// A performance knob only; correctness comes from the document overlap gate.
    #[serde(default = "default_semantic_threshold")]
    pub semantic_threshold: f32,

    /// Minimum document overlap for a semantic match to be served
    #[serde(default = "default_validation_threshold")]
    pub validation_threshold: f32,

    /// How many recently-stored entries the semantic tier compares against
    #[serde(default = "default_max_semantic_candidates")]
    pub max_semantic_candidates: usize,

    /// Upper bound on a single embedding call
    #[serde(default = "default_embedding_timeout_ms")]
    pub embedding_timeout_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_namespace() -> String {
    "rag:query".to_string()
}

fn default_max_cache_size() -> usize {
    10_000
}

fn default_ttl_secs() -> u64 {
    // 7 days
    604_800
}

fn default_semantic_threshold() -> f32 {
    0.95
}

fn default_validation_threshold() -> f32 {
    0.3
}

fn default_max_semantic_candidates() -> usize {
    256
}

fn default_embedding_timeout_ms() -> u64 {
    5_000
}

impl Default for QueryCacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            namespace: default_namespace(),
            scope: None,
            max_cache_size: default_max_cache_size(),
            ttl_secs: default_ttl_secs(),
            enable_semantic: default_true(),
            semantic_threshold: default_semantic_threshold(),
            validation_threshold: default_validation_threshold(),
            max_semantic_candidates: default_max_semantic_candidates(),
            embedding_timeout_ms: default_embedding_timeout_ms(),
        }
    }
}

impl QueryCacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_millis(self.embedding_timeout_ms)
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Set the maximum number of entries (at least one)
    pub fn with_max_cache_size(mut self, max: usize) -> Self {
        self.max_cache_size = max.max(1);
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_secs = ttl.as_secs();
        self
    }

    pub fn with_semantic(mut self, enabled: bool) -> Self {
        self.enable_semantic = enabled;
        self
    }

    pub fn with_semantic_threshold(mut self, threshold: f32) -> Self {
        self.semantic_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn with_validation_threshold(mut self, threshold: f32) -> Self {
        self.validation_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn with_max_semantic_candidates(mut self, max: usize) -> Self {
        self.max_semantic_candidates = max;
        self
    }

    pub fn with_embedding_timeout(mut self, timeout: Duration) -> Self {
        self.embedding_timeout_ms = timeout.as_millis() as u64;
        self
    }
}
