use serde::Deserialize;
use std::collections::HashMap;

use crate::domain::{
    AdaptiveFeatureProfile, AdaptiveFeatureSelector, DomainError, FeatureProfileTable,
    QueryCacheConfig, QueryType,
};
use crate::infrastructure::classification::ClassifierConfig;
use crate::infrastructure::conversation::MemoryConfig;
use crate::infrastructure::embedding::EmbeddingConfig;
use crate::infrastructure::llm::LlmConfig;
use crate::infrastructure::logging::LoggingConfig;
use crate::infrastructure::services::QueryServiceConfig;
use crate::infrastructure::store::StoreConfig;
use crate::infrastructure::transformation::TransformationConfig;

/// Engine configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub cache: QueryCacheConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub transformation: TransformationConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub query: QueryServiceConfig,
    /// Profile overrides by query type; types left out keep the built-in profile
    #[serde(default)]
    pub profiles: HashMap<QueryType, AdaptiveFeatureProfile>,
}

impl EngineConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("RAG")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Builds the selector, rejecting override profiles with zero variants or documents
    pub fn feature_selector(&self) -> Result<AdaptiveFeatureSelector, DomainError> {
        let overrides = self
            .profiles
            .iter()
            .map(|(query_type, p)| {
                AdaptiveFeatureProfile::new(
                    p.enable_expansion,
                    p.enable_multi_query,
                    p.num_query_variants,
                    p.rerank_document_count,
                    p.description.clone(),
                )
                .map(|profile| (*query_type, profile))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(AdaptiveFeatureSelector::new(FeatureProfileTable::with_overrides(
            overrides,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::llm::LlmBackend;
    use crate::infrastructure::store::StoreType;

    fn from_json(json: &str) -> EngineConfig {
        config::Config::builder()
            .add_source(config::File::from_str(json, config::FileFormat::Json))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = from_json("{}");

        assert_eq!(config.store.store_type, StoreType::InMemory);
        assert_eq!(config.llm.backend, LlmBackend::Ollama);
        assert_eq!(config.cache.max_cache_size, QueryCacheConfig::default().max_cache_size);
        assert!(config.memory.enabled);
        assert!(config.profiles.is_empty());
    }

    #[test]
    fn test_sections_override_defaults() {
        let config = from_json(
            r#"{
                "store": {"store_type": "redis", "redis_url": "redis://cache:6379"},
                "llm": {"backend": "vllm", "model": "mistral"},
                "cache": {"semantic_threshold": 0.9}
            }"#,
        );

        assert_eq!(config.store.store_type, StoreType::Redis);
        assert_eq!(config.llm.backend, LlmBackend::Vllm);
        assert_eq!(config.llm.model, "mistral");
        assert_eq!(config.cache.semantic_threshold, 0.9);
    }

    #[test]
    fn test_profile_overrides() {
        let config = from_json(
            r#"{
                "profiles": {
                    "factual": {
                        "enable_expansion": true,
                        "enable_multi_query": false,
                        "num_query_variants": 1,
                        "rerank_document_count": 8,
                        "description": "Wide factual"
                    }
                }
            }"#,
        );

        let selector = config.feature_selector().unwrap();

        assert_eq!(selector.select(QueryType::Factual).rerank_document_count, 8);
        assert_eq!(selector.select(QueryType::Complex).num_query_variants, 4);
    }

    #[test]
    fn test_invalid_profile_rejected() {
        let config = from_json(
            r#"{
                "profiles": {
                    "temporal": {
                        "enable_expansion": false,
                        "enable_multi_query": true,
                        "num_query_variants": 0,
                        "rerank_document_count": 3,
                        "description": "Broken"
                    }
                }
            }"#,
        );

        assert!(matches!(
            config.feature_selector(),
            Err(DomainError::Validation { .. })
        ));
    }
}
