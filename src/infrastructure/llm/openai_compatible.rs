use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use std::time::Instant;
use tracing::debug;

use super::http_client::HttpClientTrait;
use super::lines::lines;
use crate::domain::{DomainError, GenerationRequest, LlmProvider, TextStream};
use crate::infrastructure::observability::{record_llm_request, LlmRequestMetricParams};

/// Server flavour behind an OpenAI-compatible completions endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionServer {
    Vllm,
    LlamaCpp,
}

impl CompletionServer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vllm => "vllm",
            Self::LlamaCpp => "llama_cpp",
        }
    }
}

/// `/v1/completions` provider for vLLM and llama.cpp server
#[derive(Debug)]
pub struct OpenAiCompatibleProvider<C: HttpClientTrait> {
    client: C,
    server: CompletionServer,
    base_url: String,
    model: String,
    auth_header: Option<String>,
}

impl<C: HttpClientTrait> OpenAiCompatibleProvider<C> {
    pub fn new(
        client: C,
        server: CompletionServer,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            server,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            auth_header: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.auth_header = Some(format!("Bearer {}", api_key.into()));
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/completions", self.base_url)
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        let mut headers = vec![("Content-Type", "application/json")];
        if let Some(ref auth) = self.auth_header {
            headers.push(("Authorization", auth.as_str()));
        }
        headers
    }

    fn build_request(&self, request: &GenerationRequest, stream: bool) -> serde_json::Value {
        // The completions API has no system slot
        let prompt = match request.system {
            Some(ref system) => format!("{}\n\n{}", system, request.prompt),
            None => request.prompt.clone(),
        };

        let mut body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": stream,
        });

        if let Some(temp) = request.temperature {
            body["temperature"] = serde_json::json!(temp);
        }

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if !request.stop.is_empty() {
            body["stop"] = serde_json::json!(request.stop);
        }

        body
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<String, DomainError> {
        let response: CompletionResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::provider(
                self.server.as_str(),
                format!("Failed to parse response: {}", e),
            )
        })?;

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.text)
            .ok_or_else(|| DomainError::provider(self.server.as_str(), "No choices in response"))
    }

    fn record(&self, operation: &str, started: Instant, success: bool) {
        record_llm_request(LlmRequestMetricParams {
            backend: self.server.as_str(),
            operation,
            duration: started.elapsed(),
            success,
        });
    }
}

#[async_trait]
impl<C: HttpClientTrait> LlmProvider for OpenAiCompatibleProvider<C> {
    async fn generate(&self, request: GenerationRequest) -> Result<String, DomainError> {
        let started = Instant::now();
        let body = self.build_request(&request, false);

        let result = match self
            .client
            .post_json(&self.completions_url(), self.headers(), &body)
            .await
        {
            Ok(json) => self.parse_response(json),
            Err(e) => Err(e),
        };

        self.record("generate", started, result.is_ok());
        debug!(
            backend = self.server.as_str(),
            model = %self.model,
            success = result.is_ok(),
            "Completion request finished"
        );
        result
    }

    async fn stream(&self, request: GenerationRequest) -> Result<TextStream, DomainError> {
        let started = Instant::now();
        let body = self.build_request(&request, true);

        let byte_stream = self
            .client
            .post_json_stream(&self.completions_url(), self.headers(), &body)
            .await;
        self.record("stream", started, byte_stream.is_ok());

        let stream = lines(byte_stream?).filter_map(|line| async move {
            match line {
                Ok(line) => parse_sse_line(&line),
                Err(e) => Some(Err(e)),
            }
        });

        Ok(Box::pin(stream))
    }

    fn provider_name(&self) -> &'static str {
        self.server.as_str()
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn parse_sse_line(line: &str) -> Option<Result<String, DomainError>> {
    let data = line.strip_prefix("data:")?.trim();
    if data == "[DONE]" {
        return None;
    }

    let chunk = serde_json::from_str::<CompletionResponse>(data).ok()?;
    chunk
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.text)
        .filter(|text| !text.is_empty())
        .map(Ok)
}

// OpenAI completions API types

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::llm::http_client::mock::MockHttpClient;
    use bytes::Bytes;

    const TEST_URL: &str = "http://vllm:8000/v1/completions";

    fn provider(client: MockHttpClient) -> OpenAiCompatibleProvider<MockHttpClient> {
        OpenAiCompatibleProvider::new(client, CompletionServer::Vllm, "http://vllm:8000/", "mistral-7b")
    }

    #[tokio::test]
    async fn test_completion() {
        let client = MockHttpClient::new().with_response(
            TEST_URL,
            serde_json::json!({
                "id": "cmpl-1",
                "object": "text_completion",
                "choices": [{"index": 0, "text": "Paris", "finish_reason": "stop"}]
            }),
        );
        let provider = provider(client);

        let request = GenerationRequest::builder("Capital of France?")
            .system("Answer briefly")
            .max_tokens(5)
            .stop("\n")
            .build();
        let text = provider.generate(request).await.unwrap();

        assert_eq!(text, "Paris");

        let body = &provider.client.requests()[0].1;
        assert_eq!(body["prompt"], "Answer briefly\n\nCapital of France?");
        assert_eq!(body["max_tokens"], 5);
        assert_eq!(body["stop"][0], "\n");
    }

    #[tokio::test]
    async fn test_no_choices() {
        let client = MockHttpClient::new().with_response(TEST_URL, serde_json::json!({"choices": []}));

        let result = provider(client).generate(GenerationRequest::new("x")).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_sse_stream() {
        let client = MockHttpClient::new().with_stream_response(
            TEST_URL,
            vec![
                Bytes::from("data: {\"choices\":[{\"text\":\"Par\"}]}\n\n"),
                Bytes::from("data: {\"choices\":[{\"text\":\"is\"}]}\n\ndata: [DONE]\n\n"),
            ],
        );

        let chunks: Vec<String> = provider(client)
            .stream(GenerationRequest::new("x"))
            .await
            .unwrap()
            .map(|c| c.unwrap())
            .collect()
            .await;

        assert_eq!(chunks, vec!["Par", "is"]);
    }

    #[test]
    fn test_provider_name_follows_server() {
        let llama = OpenAiCompatibleProvider::new(
            MockHttpClient::new(),
            CompletionServer::LlamaCpp,
            "http://localhost:8080",
            "local",
        )
        .with_api_key("secret");

        assert_eq!(llama.provider_name(), "llama_cpp");
        assert!(llama.headers().contains(&("Authorization", "Bearer secret")));
    }
}
