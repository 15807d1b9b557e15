use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::{CachedEmbeddingProvider, OllamaEmbeddingProvider, OpenAiCompatibleEmbeddingProvider};
use crate::domain::{DomainError, EmbeddingProvider, KeyValueStore};
use crate::infrastructure::llm::HttpClient;

/// Embedding backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingBackend {
    #[default]
    Ollama,
    #[serde(rename = "openai_compatible")]
    OpenAiCompatible,
}

/// Embedding provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    /// Without an embedding provider the semantic cache tier is off
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub backend: EmbeddingBackend,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub dimensions: Option<usize>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Wrap the provider in the store-backed embedding cache
    #[serde(default = "default_true")]
    pub cache_enabled: bool,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_cache_ttl_secs() -> u64 {
    604_800
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: EmbeddingBackend::default(),
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            dimensions: None,
            request_timeout_ms: default_request_timeout_ms(),
            cache_enabled: true,
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

/// Factory for creating embedding providers
#[derive(Debug)]
pub struct EmbeddingProviderFactory;

impl EmbeddingProviderFactory {
    /// Create the configured provider, or `None` when embeddings are disabled
    pub fn create(
        config: &EmbeddingConfig,
        store: Option<Arc<dyn KeyValueStore>>,
    ) -> Result<Option<Arc<dyn EmbeddingProvider>>, DomainError> {
        if !config.enabled {
            info!("Embeddings disabled, semantic cache tier unavailable");
            return Ok(None);
        }

        let client = HttpClient::with_timeout(Duration::from_millis(config.request_timeout_ms))?;

        let provider: Arc<dyn EmbeddingProvider> = match config.backend {
            EmbeddingBackend::Ollama => {
                let provider =
                    OllamaEmbeddingProvider::with_base_url(client, &config.model, &config.base_url);
                match config.dimensions {
                    Some(dims) => Arc::new(provider.with_dimensions(dims)),
                    None => Arc::new(provider),
                }
            }
            EmbeddingBackend::OpenAiCompatible => {
                let mut provider =
                    OpenAiCompatibleEmbeddingProvider::new(client, &config.base_url, &config.model);
                if let Some(ref key) = config.api_key {
                    provider = provider.with_api_key(key);
                }
                if let Some(dims) = config.dimensions {
                    provider = provider.with_dimensions(dims);
                }
                Arc::new(provider)
            }
        };

        info!(
            backend = provider.provider_name(),
            model = %config.model,
            cached = config.cache_enabled && store.is_some(),
            "Created embedding provider"
        );

        match store {
            Some(store) if config.cache_enabled => Ok(Some(Arc::new(
                CachedEmbeddingProvider::new(provider, store)
                    .with_ttl(Duration::from_secs(config.cache_ttl_secs)),
            ))),
            _ => Ok(Some(provider)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::store::MockKeyValueStore;

    #[test]
    fn test_disabled() {
        let config = EmbeddingConfig {
            enabled: false,
            ..Default::default()
        };

        assert!(EmbeddingProviderFactory::create(&config, None).unwrap().is_none());
    }

    #[test]
    fn test_create_openai_compatible() {
        let config = EmbeddingConfig {
            backend: EmbeddingBackend::OpenAiCompatible,
            dimensions: Some(384),
            ..Default::default()
        };

        let provider = EmbeddingProviderFactory::create(&config, None).unwrap().unwrap();

        assert_eq!(provider.provider_name(), "openai_compatible");
        assert_eq!(provider.dimensions(), Some(384));
    }

    #[test]
    fn test_cached_wrapper_keeps_inner_identity() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MockKeyValueStore::new());

        let provider = EmbeddingProviderFactory::create(&EmbeddingConfig::default(), Some(store))
            .unwrap()
            .unwrap();

        assert_eq!(provider.provider_name(), "ollama");
    }

    #[test]
    fn test_deserialize_defaults() {
        let config: EmbeddingConfig =
            serde_json::from_value(serde_json::json!({"backend": "openai_compatible"})).unwrap();

        assert_eq!(config.backend, EmbeddingBackend::OpenAiCompatible);
        assert!(config.cache_enabled);
        assert_eq!(config.cache_ttl_secs, 604_800);
    }
}
