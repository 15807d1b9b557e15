//! Multi-turn conversation memory

mod memory;

pub use memory::{ContextualQuery, ConversationMemory, Exchange};

use serde::Deserialize;

/// Conversation memory configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_max_exchanges")]
    pub max_exchanges: usize,
    #[serde(default = "default_summarization_threshold")]
    pub summarization_threshold: usize,
    #[serde(default = "default_true")]
    pub enable_summarization: bool,
    #[serde(default = "default_summarization_timeout_ms")]
    pub summarization_timeout_ms: u64,
    /// Past exchanges prepended to a follow-up query
    #[serde(default = "default_context_exchanges")]
    pub context_exchanges: usize,
}

fn default_true() -> bool {
    true
}

fn default_max_exchanges() -> usize {
    10
}

fn default_summarization_threshold() -> usize {
    5
}

fn default_summarization_timeout_ms() -> u64 {
    15_000
}

fn default_context_exchanges() -> usize {
    3
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_exchanges: default_max_exchanges(),
            summarization_threshold: default_summarization_threshold(),
            enable_summarization: true,
            summarization_timeout_ms: default_summarization_timeout_ms(),
            context_exchanges: default_context_exchanges(),
        }
    }
}
