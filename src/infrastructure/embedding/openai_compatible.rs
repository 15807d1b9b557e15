//! OpenAI-compatible embedding provider (vLLM, llama.cpp server, TEI)

use async_trait::async_trait;
use serde::Deserialize;

use super::HttpClientTrait;
use crate::domain::{DomainError, EmbeddingProvider};

/// `/v1/embeddings` provider
#[derive(Debug)]
pub struct OpenAiCompatibleEmbeddingProvider<C: HttpClientTrait> {
    client: C,
    auth_header: Option<String>,
    base_url: String,
    model: String,
    dimensions: Option<usize>,
}

impl<C: HttpClientTrait> OpenAiCompatibleEmbeddingProvider<C> {
    pub fn new(client: C, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            auth_header: None,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            dimensions: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.auth_header = Some(format!("Bearer {}", api_key.into()));
        self
    }

    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    fn embeddings_url(&self) -> String {
        format!("{}/v1/embeddings", self.base_url)
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        let mut headers = vec![("Content-Type", "application/json")];
        if let Some(ref auth) = self.auth_header {
            headers.push(("Authorization", auth.as_str()));
        }
        headers
    }
}

#[async_trait]
impl<C: HttpClientTrait> EmbeddingProvider for OpenAiCompatibleEmbeddingProvider<C> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });

        let json = self
            .client
            .post_json(&self.embeddings_url(), self.headers(), &body)
            .await
            .map_err(|e| DomainError::embedding("openai_compatible", e.to_string()))?;

        let response: EmbeddingResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::embedding(
                "openai_compatible",
                format!("Failed to parse embedding response: {}", e),
            )
        })?;

        let embedding = response
            .data
            .into_iter()
            .min_by_key(|d| d.index)
            .map(|d| d.embedding)
            .ok_or_else(|| DomainError::embedding("openai_compatible", "No embeddings in response"))?;

        super::check_dimensions("openai_compatible", self.dimensions, embedding)
    }

    fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    fn provider_name(&self) -> &'static str {
        "openai_compatible"
    }
}

// OpenAI API types for embeddings

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::llm::MockHttpClient;

    const TEST_URL: &str = "http://localhost:8000/v1/embeddings";

    fn create_mock_response(dimensions: usize) -> serde_json::Value {
        let embedding: Vec<f32> = (0..dimensions).map(|j| j as f32 * 0.001).collect();
        serde_json::json!({
            "object": "list",
            "model": "bge-small",
            "data": [{"index": 0, "embedding": embedding, "object": "embedding"}],
            "usage": {"prompt_tokens": 3, "total_tokens": 3}
        })
    }

    #[tokio::test]
    async fn test_embed_single_text() {
        let client = MockHttpClient::new().with_response(TEST_URL, create_mock_response(384));
        let provider = OpenAiCompatibleEmbeddingProvider::new(client, "http://localhost:8000", "bge-small")
            .with_dimensions(384);

        let vector = provider.embed("Hello world").await.unwrap();

        assert_eq!(vector.len(), 384);
        assert_eq!(provider.client.requests()[0].1["input"], "Hello world");
    }

    #[tokio::test]
    async fn test_empty_data_is_error() {
        let client = MockHttpClient::new().with_response(TEST_URL, serde_json::json!({"data": []}));
        let provider = OpenAiCompatibleEmbeddingProvider::new(client, "http://localhost:8000/", "bge-small");

        assert!(provider.embed("Hello").await.is_err());
    }

    #[test]
    fn test_auth_header() {
        let provider =
            OpenAiCompatibleEmbeddingProvider::new(MockHttpClient::new(), "http://x", "m")
                .with_api_key("token");

        assert!(provider.headers().contains(&("Authorization", "Bearer token")));
        assert_eq!(provider.provider_name(), "openai_compatible");
    }
}
