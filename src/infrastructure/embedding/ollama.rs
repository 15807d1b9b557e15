//! Ollama embedding provider implementation

use async_trait::async_trait;
use serde::Deserialize;

use super::HttpClientTrait;
use crate::domain::{DomainError, EmbeddingProvider};

const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Ollama `/api/embeddings` provider
#[derive(Debug)]
pub struct OllamaEmbeddingProvider<C: HttpClientTrait> {
    client: C,
    base_url: String,
    model: String,
    dimensions: Option<usize>,
}

impl<C: HttpClientTrait> OllamaEmbeddingProvider<C> {
    pub fn new(client: C, model: impl Into<String>) -> Self {
        Self::with_base_url(client, model, DEFAULT_OLLAMA_BASE_URL)
    }

    pub fn with_base_url(client: C, model: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            dimensions: None,
        }
    }

    /// Declares the model's output size; responses of any other size are rejected
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    fn embeddings_url(&self) -> String {
        format!("{}/api/embeddings", self.base_url)
    }
}

#[async_trait]
impl<C: HttpClientTrait> EmbeddingProvider for OllamaEmbeddingProvider<C> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": text,
        });

        let json = self
            .client
            .post_json(
                &self.embeddings_url(),
                vec![("Content-Type", "application/json")],
                &body,
            )
            .await
            .map_err(|e| DomainError::embedding("ollama", e.to_string()))?;

        let response: OllamaEmbeddingResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::embedding("ollama", format!("Failed to parse embedding response: {}", e))
        })?;

        super::check_dimensions("ollama", self.dimensions, response.embedding)
    }

    fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    fn provider_name(&self) -> &'static str {
        "ollama"
    }
}

#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}
