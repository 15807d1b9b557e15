//! Embedding provider implementations

mod cached;
mod factory;
mod ollama;
mod openai_compatible;

pub use cached::{CachedEmbeddingProvider, EmbeddingCacheStats};
pub use factory::{EmbeddingBackend, EmbeddingConfig, EmbeddingProviderFactory};
pub use ollama::OllamaEmbeddingProvider;
pub use openai_compatible::OpenAiCompatibleEmbeddingProvider;

// Re-export HTTP client for use by embedding providers
pub use super::llm::{HttpClient, HttpClientTrait};

use crate::domain::DomainError;

/// Rejects empty vectors and, when the size is declared, mismatched ones
fn check_dimensions(
    provider: &str,
    expected: Option<usize>,
    embedding: Vec<f32>,
) -> Result<Vec<f32>, DomainError> {
    if embedding.is_empty() {
        return Err(DomainError::embedding(provider, "Empty embedding returned"));
    }

    match expected {
        Some(dims) if dims != embedding.len() => Err(DomainError::embedding(
            provider,
            format!("Expected {} dimensions, got {}", dims, embedding.len()),
        )),
        _ => Ok(embedding),
    }
}
