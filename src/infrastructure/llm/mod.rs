//! LLM provider implementations

mod factory;
mod http_client;
mod lines;
mod ollama;
mod openai_compatible;

pub use factory::{LlmBackend, LlmConfig, LlmProviderFactory};
pub use http_client::{ByteStream, HttpClient, HttpClientTrait};
pub use ollama::OllamaProvider;
pub use openai_compatible::{CompletionServer, OpenAiCompatibleProvider};

#[cfg(test)]
pub use http_client::mock::MockHttpClient;
