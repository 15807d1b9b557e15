use async_trait::async_trait;
use futures::Stream;
use std::fmt::Debug;
use std::pin::Pin;

use super::GenerationRequest;
use crate::domain::DomainError;

/// Stream of generated text fragments
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, DomainError>> + Send>>;

/// Text generation backend (Ollama, vLLM, llama.cpp server, etc.)
#[async_trait]
pub trait LlmProvider: Send + Sync + Debug {
    /// Generate a full completion for the request
    async fn generate(&self, request: GenerationRequest) -> Result<String, DomainError>;

    /// Stream a completion; defaults to a single chunk holding the full text
    async fn stream(&self, request: GenerationRequest) -> Result<TextStream, DomainError> {
        let text = self.generate(request).await?;
        Ok(Box::pin(futures::stream::once(async move { Ok(text) })))
    }

    /// Get the provider name
    fn provider_name(&self) -> &'static str;

    /// Model the provider sends requests to
    fn model(&self) -> &str;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Mock provider answering from prompt-substring rules, in registration order
    #[derive(Debug)]
    pub struct MockLlmProvider {
        name: &'static str,
        rules: Vec<(String, String)>,
        response: Option<String>,
        error: Option<String>,
        delay: Option<Duration>,
        prompts: Mutex<Vec<String>>,
    }

    impl MockLlmProvider {
        pub fn new(name: &'static str) -> Self {
            Self {
                name,
                rules: Vec::new(),
                response: None,
                error: None,
                delay: None,
                prompts: Mutex::new(Vec::new()),
            }
        }

        /// Default response for prompts no rule matches
        pub fn with_response(mut self, response: impl Into<String>) -> Self {
            self.response = Some(response.into());
            self
        }

        /// Respond with `response` when the prompt contains `needle`
        pub fn with_rule(mut self, needle: impl Into<String>, response: impl Into<String>) -> Self {
            self.rules.push((needle.into(), response.into()));
            self
        }

        pub fn with_error(mut self, error: impl Into<String>) -> Self {
            self.error = Some(error.into());
            self
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LlmProvider for MockLlmProvider {
        async fn generate(&self, request: GenerationRequest) -> Result<String, DomainError> {
            self.prompts.lock().unwrap().push(request.prompt.clone());

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            if let Some(ref error) = self.error {
                return Err(DomainError::provider(self.name, error));
            }

            self.rules
                .iter()
                .find(|(needle, _)| request.prompt.contains(needle.as_str()))
                .map(|(_, response)| response.clone())
                .or_else(|| self.response.clone())
                .ok_or_else(|| DomainError::provider(self.name, "No mock response configured"))
        }

        fn provider_name(&self) -> &'static str {
            self.name
        }

        fn model(&self) -> &str {
            "mock-model"
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use futures::StreamExt;

        #[tokio::test]
        async fn test_rules_take_precedence() {
            let provider = MockLlmProvider::new("mock")
                .with_rule("classify", "FACTUAL")
                .with_response("default");

            let classified = provider
                .generate(GenerationRequest::new("please classify"))
                .await
                .unwrap();
            let other = provider
                .generate(GenerationRequest::new("anything"))
                .await
                .unwrap();

            assert_eq!(classified, "FACTUAL");
            assert_eq!(other, "default");
            assert_eq!(provider.call_count(), 2);
        }

        #[tokio::test]
        async fn test_error() {
            let provider = MockLlmProvider::new("mock").with_error("boom");

            let result = provider.generate(GenerationRequest::new("x")).await;

            assert!(result.is_err());
        }

        #[tokio::test]
        async fn test_default_stream_is_single_chunk() {
            let provider = MockLlmProvider::new("mock").with_response("full answer");

            let chunks: Vec<_> = provider
                .stream(GenerationRequest::new("x"))
                .await
                .unwrap()
                .collect()
                .await;

            assert_eq!(chunks.len(), 1);
            assert_eq!(chunks[0].as_ref().unwrap(), "full answer");
        }
    }
}
