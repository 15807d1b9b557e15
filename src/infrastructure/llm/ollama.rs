use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use std::time::Instant;
use tracing::debug;

use super::http_client::HttpClientTrait;
use super::lines::lines;
use crate::domain::{DomainError, GenerationRequest, LlmProvider, TextStream};
use crate::infrastructure::observability::{record_llm_request, LlmRequestMetricParams};

const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Ollama `/api/generate` provider
#[derive(Debug)]
pub struct OllamaProvider<C: HttpClientTrait> {
    client: C,
    base_url: String,
    model: String,
}

impl<C: HttpClientTrait> OllamaProvider<C> {
    pub fn new(client: C, model: impl Into<String>) -> Self {
        Self::with_base_url(client, model, DEFAULT_OLLAMA_BASE_URL)
    }

    pub fn with_base_url(client: C, model: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![("Content-Type", "application/json")]
    }

    fn build_request(&self, request: &GenerationRequest, stream: bool) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "prompt": request.prompt,
            "stream": stream,
        });

        if let Some(ref system) = request.system {
            body["system"] = serde_json::json!(system);
        }

        let mut options = serde_json::Map::new();
        if let Some(temp) = request.temperature {
            options.insert("temperature".into(), serde_json::json!(temp));
        }
        if let Some(max_tokens) = request.max_tokens {
            options.insert("num_predict".into(), serde_json::json!(max_tokens));
        }
        if !request.stop.is_empty() {
            options.insert("stop".into(), serde_json::json!(request.stop));
        }
        if !options.is_empty() {
            body["options"] = serde_json::Value::Object(options);
        }

        body
    }

    fn record(&self, operation: &str, started: Instant, success: bool) {
        record_llm_request(LlmRequestMetricParams {
            backend: "ollama",
            operation,
            duration: started.elapsed(),
            success,
        });
    }
}

#[async_trait]
impl<C: HttpClientTrait> LlmProvider for OllamaProvider<C> {
    async fn generate(&self, request: GenerationRequest) -> Result<String, DomainError> {
        let started = Instant::now();
        let body = self.build_request(&request, false);

        let result = async {
            let json = self
                .client
                .post_json(&self.generate_url(), self.headers(), &body)
                .await?;
            let response: OllamaChunk = serde_json::from_value(json).map_err(|e| {
                DomainError::provider("ollama", format!("Failed to parse response: {}", e))
            })?;
            response.into_text()
        }
        .await;

        self.record("generate", started, result.is_ok());
        debug!(model = %self.model, success = result.is_ok(), "Ollama generate completed");
        result
    }

    async fn stream(&self, request: GenerationRequest) -> Result<TextStream, DomainError> {
        let started = Instant::now();
        let body = self.build_request(&request, true);

        let byte_stream = self
            .client
            .post_json_stream(&self.generate_url(), self.headers(), &body)
            .await;
        self.record("stream", started, byte_stream.is_ok());

        let stream = lines(byte_stream?).filter_map(|line| async move {
            match line {
                Ok(line) => parse_ndjson_line(&line),
                Err(e) => Some(Err(e)),
            }
        });

        Ok(Box::pin(stream))
    }

    fn provider_name(&self) -> &'static str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn parse_ndjson_line(line: &str) -> Option<Result<String, DomainError>> {
    match serde_json::from_str::<OllamaChunk>(line) {
        Ok(chunk) => match chunk.into_text() {
            Ok(text) if text.is_empty() => None,
            other => Some(other),
        },
        Err(e) => Some(Err(DomainError::provider(
            "ollama",
            format!("Invalid stream line: {}", e),
        ))),
    }
}

// Ollama API types

#[derive(Debug, Deserialize)]
struct OllamaChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    error: Option<String>,
}

impl OllamaChunk {
    fn into_text(self) -> Result<String, DomainError> {
        match self.error {
            Some(error) => Err(DomainError::provider("ollama", error)),
            None => Ok(self.response),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::llm::http_client::mock::MockHttpClient;
    use bytes::Bytes;

    const TEST_URL: &str = "http://localhost:11434/api/generate";

    #[tokio::test]
    async fn test_ollama_generate() {
        let client = MockHttpClient::new().with_response(
            TEST_URL,
            serde_json::json!({"model": "llama3", "response": "FACTUAL", "done": true}),
        );
        let provider = OllamaProvider::new(client, "llama3");

        let request = GenerationRequest::builder("Classify: what is X?")
            .system("You classify queries")
            .temperature(0.0)
            .max_tokens(10)
            .build();
        let text = provider.generate(request).await.unwrap();

        assert_eq!(text, "FACTUAL");

        let (url, body) = provider.client.requests().remove(0);
        assert_eq!(url, TEST_URL);
        assert_eq!(body["model"], "llama3");
        assert_eq!(body["stream"], false);
        assert_eq!(body["system"], "You classify queries");
        assert_eq!(body["options"]["num_predict"], 10);
    }

    #[tokio::test]
    async fn test_ollama_generate_error_field() {
        let client = MockHttpClient::new().with_response(
            TEST_URL,
            serde_json::json!({"error": "model 'missing' not found"}),
        );
        let provider = OllamaProvider::new(client, "missing");

        let result = provider.generate(GenerationRequest::new("hi")).await;

        assert!(matches!(result, Err(DomainError::Provider { .. })));
    }

    #[tokio::test]
    async fn test_ollama_http_error() {
        let client = MockHttpClient::new().with_error(TEST_URL, "connection refused");
        let provider = OllamaProvider::new(client, "llama3");

        assert!(provider.generate(GenerationRequest::new("hi")).await.is_err());
    }

    #[tokio::test]
    async fn test_ollama_stream() {
        let client = MockHttpClient::new().with_stream_response(
            TEST_URL,
            vec![
                Bytes::from("{\"response\":\"Hel\",\"done\":false}\n{\"resp"),
                Bytes::from("onse\":\"lo\",\"done\":false}\n"),
                Bytes::from("{\"response\":\"\",\"done\":true}\n"),
            ],
        );
        let provider = OllamaProvider::new(client, "llama3");

        let chunks: Vec<String> = provider
            .stream(GenerationRequest::new("hi"))
            .await
            .unwrap()
            .map(|c| c.unwrap())
            .collect()
            .await;

        assert_eq!(chunks, vec!["Hel", "lo"]);
        assert_eq!(provider.client.requests()[0].1["stream"], true);
    }

    #[test]
    fn test_provider_metadata() {
        let provider =
            OllamaProvider::with_base_url(MockHttpClient::new(), "mistral", "http://gpu:11434/");

        assert_eq!(provider.provider_name(), "ollama");
        assert_eq!(provider.model(), "mistral");
        assert_eq!(provider.generate_url(), "http://gpu:11434/api/generate");
    }
}
