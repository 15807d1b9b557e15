use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::http_client::HttpClient;
use super::ollama::OllamaProvider;
use super::openai_compatible::{CompletionServer, OpenAiCompatibleProvider};
use crate::domain::{DomainError, LlmProvider};

/// Generation backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmBackend {
    #[default]
    Ollama,
    Vllm,
    LlamaCpp,
}

impl LlmBackend {
    fn default_base_url(&self) -> &'static str {
        match self {
            Self::Ollama => "http://localhost:11434",
            Self::Vllm => "http://localhost:8000",
            Self::LlamaCpp => "http://localhost:8080",
        }
    }
}

impl fmt::Display for LlmBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ollama => write!(f, "ollama"),
            Self::Vllm => write!(f, "vllm"),
            Self::LlamaCpp => write!(f, "llama_cpp"),
        }
    }
}

impl FromStr for LlmBackend {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "vllm" => Ok(Self::Vllm),
            "llama_cpp" | "llamacpp" | "llama.cpp" => Ok(Self::LlamaCpp),
            other => Err(DomainError::configuration(format!(
                "Unknown LLM backend: {}",
                other
            ))),
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub backend: LlmBackend,
    /// Falls back to the backend's conventional local address
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_model() -> String {
    "llama3".to_string()
}

fn default_request_timeout_ms() -> u64 {
    120_000
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: LlmBackend::default(),
            base_url: None,
            model: default_model(),
            api_key: None,
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl LlmConfig {
    pub fn new(backend: LlmBackend, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.backend.default_base_url())
    }
}

/// Factory for creating LLM providers
#[derive(Debug)]
pub struct LlmProviderFactory;

impl LlmProviderFactory {
    /// Create an LLM provider from configuration
    pub fn create(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, DomainError> {
        if config.model.trim().is_empty() {
            return Err(DomainError::configuration("LLM model must not be empty"));
        }

        let http_client = HttpClient::with_timeout(Duration::from_millis(config.request_timeout_ms))?;
        let base_url = config.base_url();

        info!(backend = %config.backend, model = %config.model, base_url, "Creating LLM provider");

        let provider: Arc<dyn LlmProvider> = match config.backend {
            LlmBackend::Ollama => Arc::new(OllamaProvider::with_base_url(
                http_client,
                &config.model,
                base_url,
            )),
            LlmBackend::Vllm | LlmBackend::LlamaCpp => {
                let server = match config.backend {
                    LlmBackend::Vllm => CompletionServer::Vllm,
                    _ => CompletionServer::LlamaCpp,
                };
                let provider =
                    OpenAiCompatibleProvider::new(http_client, server, base_url, &config.model);

                match config.api_key {
                    Some(ref key) => Arc::new(provider.with_api_key(key)),
                    None => Arc::new(provider),
                }
            }
        };

        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_each_backend() {
        for (backend, name) in [
            (LlmBackend::Ollama, "ollama"),
            (LlmBackend::Vllm, "vllm"),
            (LlmBackend::LlamaCpp, "llama_cpp"),
        ] {
            let provider = LlmProviderFactory::create(&LlmConfig::new(backend, "m")).unwrap();
            assert_eq!(provider.provider_name(), name);
            assert_eq!(provider.model(), "m");
        }
    }

    #[test]
    fn test_empty_model_rejected() {
        let result = LlmProviderFactory::create(&LlmConfig::new(LlmBackend::Ollama, " "));
        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }

    #[test]
    fn test_base_url_defaults_per_backend() {
        assert_eq!(LlmConfig::default().base_url(), "http://localhost:11434");
        assert_eq!(
            LlmConfig::new(LlmBackend::Vllm, "m").base_url(),
            "http://localhost:8000"
        );
        assert_eq!(
            LlmConfig::new(LlmBackend::Vllm, "m")
                .with_base_url("http://gpu:9000")
                .base_url(),
            "http://gpu:9000"
        );
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("vLLM".parse::<LlmBackend>().unwrap(), LlmBackend::Vllm);
        assert_eq!("llama.cpp".parse::<LlmBackend>().unwrap(), LlmBackend::LlamaCpp);
        assert!("bedrock".parse::<LlmBackend>().is_err());
    }

    #[test]
    fn test_deserialize_config() {
        let config: LlmConfig =
            serde_json::from_value(serde_json::json!({"backend": "llama_cpp", "model": "phi3"}))
                .unwrap();

        assert_eq!(config.backend, LlmBackend::LlamaCpp);
        assert_eq!(config.request_timeout_ms, 120_000);
    }
}
