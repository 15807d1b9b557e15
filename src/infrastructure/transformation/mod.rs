//! Query transformation implementations

mod expander;
mod pipeline;

pub use expander::{HydeExpander, MultiQueryRewriter};
pub use pipeline::QueryTransformationPipeline;

use serde::Deserialize;

use crate::domain::transformation::DEFAULT_MIN_VARIANT_LENGTH;

/// Global switches and limits for query transformation
#[derive(Debug, Clone, Deserialize)]
pub struct TransformationConfig {
    /// Allows expansion for profiles that request it
    #[serde(default = "default_true")]
    pub enable_expansion: bool,
    /// Allows multi-query rewriting for profiles that request it
    #[serde(default = "default_true")]
    pub enable_multi_query: bool,
    #[serde(default = "default_llm_timeout_ms")]
    pub llm_timeout_ms: u64,
    #[serde(default = "default_expansion_temperature")]
    pub expansion_temperature: f32,
    #[serde(default = "default_min_variant_length")]
    pub min_variant_length: usize,
}

fn default_true() -> bool {
    true
}

fn default_llm_timeout_ms() -> u64 {
    15_000
}

fn default_expansion_temperature() -> f32 {
    0.3
}

fn default_min_variant_length() -> usize {
    DEFAULT_MIN_VARIANT_LENGTH
}

impl Default for TransformationConfig {
    fn default() -> Self {
        Self {
            enable_expansion: true,
            enable_multi_query: true,
            llm_timeout_ms: default_llm_timeout_ms(),
            expansion_temperature: default_expansion_temperature(),
            min_variant_length: default_min_variant_length(),
        }
    }
}
