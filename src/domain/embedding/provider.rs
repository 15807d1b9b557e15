//! Embedding provider trait definition

use async_trait::async_trait;
use std::fmt::Debug;

use crate::domain::DomainError;

/// Maps text to a dense vector (Ollama, vLLM, llama.cpp server, etc.)
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + Debug {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError>;

    /// Vector dimensionality, when known up front
    fn dimensions(&self) -> Option<usize>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;
}
