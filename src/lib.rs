//! RAG Query Engine
//!
//! The query side of a retrieval-augmented generation service:
//! - Multi-stage query cache (exact, normalized, semantic with document-overlap validation)
//! - Query classification and adaptive feature profiles
//! - HyDE expansion and multi-query rewriting
//! - Pluggable LLM, embedding and key-value store backends
//! - Answer confidence scoring and conversation memory
//!
//! Vector search and reranking are supplied by the caller through
//! [`domain::RetrievalOrchestrator`].

pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::EngineConfig;

use std::sync::Arc;

use domain::RetrievalOrchestrator;
use infrastructure::{
    cache::MultiStageCacheManager,
    conversation::ConversationMemory,
    embedding::EmbeddingProviderFactory,
    llm::LlmProviderFactory,
    services::{QueryService, QueryServiceDeps},
    store::StoreFactory,
    transformation::QueryTransformationPipeline,
};
use tracing::info;

/// Create a query service from `.env`, config files and `RAG__` environment variables
pub async fn create_query_service(
    retriever: Arc<dyn RetrievalOrchestrator>,
) -> anyhow::Result<QueryService> {
    dotenvy::dotenv().ok();
    let config = EngineConfig::load()?;
    create_query_service_with_config(&config, retriever).await
}

/// Create a query service with custom configuration
pub async fn create_query_service_with_config(
    config: &EngineConfig,
    retriever: Arc<dyn RetrievalOrchestrator>,
) -> anyhow::Result<QueryService> {
    let store = StoreFactory::new().create(&config.store).await?;

    let embedder = EmbeddingProviderFactory::create(&config.embedding, Some(store.clone()))?;
    let llm = LlmProviderFactory::create(&config.llm)?;

    let classifier = config.classifier.create(llm.clone());
    let selector = config.feature_selector()?;
    let pipeline = QueryTransformationPipeline::new(
        llm.clone(),
        classifier,
        selector,
        config.transformation.clone(),
    );

    let cache = MultiStageCacheManager::new(store, embedder, config.cache.clone());

    let memory = config.memory.enabled.then(|| {
        Arc::new(ConversationMemory::new(
            Some(llm.clone()),
            config.memory.clone(),
        ))
    });

    info!(
        store = %config.store.store_type,
        llm = %config.llm.backend,
        semantic = config.cache.enable_semantic && config.embedding.enabled,
        memory = config.memory.enabled,
        "Query service initialized"
    );

    let deps = QueryServiceDeps {
        cache: Arc::new(cache),
        pipeline: Arc::new(pipeline),
        retriever,
        llm,
        memory,
    };

    Ok(QueryService::new(deps, config.query.clone()))
}
