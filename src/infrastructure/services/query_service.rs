//! Request-level RAG orchestration
//!
//! Ties the query cache, adaptive transformation, retrieval and generation
//! together: cache first, and on a miss classify, transform, retrieve,
//! generate, then write the answer back.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::domain::{
    CacheStats, CacheTier, ConfidenceScore, ConfidenceScorer, DomainError, GenerationRequest,
    LlmProvider, QueryType, RetrievalOrchestrator, RetrievedDocument,
};
use crate::infrastructure::cache::MultiStageCacheManager;
use crate::infrastructure::conversation::ConversationMemory;
use crate::infrastructure::timeout::with_timeout;
use crate::infrastructure::transformation::QueryTransformationPipeline;

const ANSWER_SYSTEM_PROMPT: &str = "You answer questions using only the provided context. \
If the context does not contain the answer, say so. Cite sources by their bracketed number.";

/// Query service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct QueryServiceConfig {
    /// Candidates fetched for the raw query to validate semantic cache hits
    #[serde(default = "default_candidate_top_k")]
    pub candidate_top_k: usize,
    #[serde(default = "default_generation_timeout_ms")]
    pub generation_timeout_ms: u64,
    #[serde(default = "default_answer_temperature")]
    pub answer_temperature: f32,
    #[serde(default)]
    pub max_answer_tokens: Option<u32>,
}

fn default_candidate_top_k() -> usize {
    10
}

fn default_generation_timeout_ms() -> u64 {
    120_000
}

fn default_answer_temperature() -> f32 {
    0.1
}

impl Default for QueryServiceConfig {
    fn default() -> Self {
        Self {
            candidate_top_k: default_candidate_top_k(),
            generation_timeout_ms: default_generation_timeout_ms(),
            answer_temperature: default_answer_temperature(),
            max_answer_tokens: None,
        }
    }
}

/// Answer returned to the request layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagAnswer {
    pub answer: String,
    /// Identifiers of the documents the answer was generated from
    pub sources: Vec<String>,
    pub query_type: Option<QueryType>,
    pub confidence: Option<ConfidenceScore>,
    /// Queries retrieved against; empty for cached answers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transformed_queries: Vec<String>,
    #[serde(default)]
    pub cache_hit: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_tier: Option<CacheTier>,
}

/// Collaborators of a [`QueryService`]
#[derive(Clone)]
pub struct QueryServiceDeps {
    pub cache: Arc<MultiStageCacheManager>,
    pub pipeline: Arc<QueryTransformationPipeline>,
    pub retriever: Arc<dyn RetrievalOrchestrator>,
    pub llm: Arc<dyn LlmProvider>,
    pub memory: Option<Arc<ConversationMemory>>,
}

/// Answers queries end to end
pub struct QueryService {
    cache: Arc<MultiStageCacheManager>,
    pipeline: Arc<QueryTransformationPipeline>,
    retriever: Arc<dyn RetrievalOrchestrator>,
    llm: Arc<dyn LlmProvider>,
    memory: Option<Arc<ConversationMemory>>,
    scorer: ConfidenceScorer,
    config: QueryServiceConfig,
}

impl std::fmt::Debug for QueryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryService")
            .field("cache", &self.cache)
            .field("llm", &self.llm.provider_name())
            .field("memory", &self.memory.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl QueryService {
    pub fn new(deps: QueryServiceDeps, config: QueryServiceConfig) -> Self {
        Self {
            cache: deps.cache,
            pipeline: deps.pipeline,
            retriever: deps.retriever,
            llm: deps.llm,
            memory: deps.memory,
            scorer: ConfidenceScorer::new(),
            config,
        }
    }

    pub fn cache(&self) -> &MultiStageCacheManager {
        &self.cache
    }

    pub fn memory(&self) -> Option<&ConversationMemory> {
        self.memory.as_deref()
    }

    /// Answers a standalone query
    pub async fn answer(&self, query: &str) -> Result<RagAnswer, DomainError> {
        self.answer_in_session(None, query).await
    }

    /// Answers a query, using and extending the session's conversation memory.
    ///
    /// Only generation failure is returned as an error; cache, classification,
    /// transformation and retrieval failures degrade.
    pub async fn answer_in_session(
        &self,
        session_id: Option<&str>,
        query: &str,
    ) -> Result<RagAnswer, DomainError> {
        let candidates = self.retrieve(&[query.to_string()], self.config.candidate_top_k).await;
        let candidate_ids: Vec<String> = candidates.iter().map(|d| d.id.clone()).collect();

        let lookup = self.cache.lookup(query, &candidate_ids).await;
        if let (Some(entry), Some(tier)) = (lookup.entry, lookup.tier) {
            match serde_json::from_value::<RagAnswer>(entry.into_payload()) {
                Ok(mut cached) => {
                    info!(tier = tier.as_str(), "Serving cached answer");
                    cached.cache_hit = true;
                    cached.cache_tier = Some(tier);
                    cached.transformed_queries.clear();
                    self.remember(session_id, query, &cached).await;
                    return Ok(cached);
                }
                Err(e) => warn!(error = %e, "Cached payload unreadable, regenerating"),
            }
        }

        let transformed = self.pipeline.transform_adaptive(query).await;
        let query_type = transformed.query_type.unwrap_or_default();
        let profile = self.pipeline.selector().select(query_type);

        let documents = self
            .retrieve(&transformed.queries, profile.rerank_document_count)
            .await;

        let conversation = match (session_id, &self.memory) {
            (Some(session), Some(memory)) => Some(
                memory
                    .context_for(session, query, memory.config().context_exchanges)
                    .await,
            )
            .filter(|c| c.context_length > 0)
            .map(|c| c.query),
            _ => None,
        };

        let answer = self
            .generate(query, &documents, conversation.as_deref())
            .await?;
        let confidence = self.scorer.score(&answer, &documents, None);

        let result = RagAnswer {
            answer,
            sources: documents.iter().map(|d| d.id.clone()).collect(),
            query_type: transformed.query_type,
            confidence: Some(confidence),
            transformed_queries: transformed.queries,
            cache_hit: false,
            cache_tier: None,
        };

        // Entries record the raw-query candidates, the same set later lookups
        // are validated against. An answer with no supporting documents is not cached.
        if !result.sources.is_empty() {
            match serde_json::to_value(&result) {
                Ok(payload) => {
                    self.cache
                        .put(query, payload, lookup.query_embedding, candidate_ids)
                        .await
                }
                Err(e) => warn!(error = %e, "Failed to serialize answer for cache"),
            }
        }

        self.remember(session_id, query, &result).await;

        debug!(
            sources = result.sources.len(),
            confidence = confidence.overall,
            "Generated answer"
        );
        Ok(result)
    }

    /// Clears the query cache and all conversation memory
    pub async fn clear(&self) {
        self.cache.clear().await;
        if let Some(ref memory) = self.memory {
            memory.clear_all().await;
        }
    }

    pub async fn stats(&self) -> CacheStats {
        self.cache.get_stats().await
    }

    async fn retrieve(&self, queries: &[String], top_k: usize) -> Vec<RetrievedDocument> {
        match self.retriever.retrieve(queries, top_k).await {
            Ok(documents) => documents,
            Err(e) => {
                warn!(error = %e, "Retrieval failed, continuing without documents");
                Vec::new()
            }
        }
    }

    async fn generate(
        &self,
        query: &str,
        documents: &[RetrievedDocument],
        conversation: Option<&str>,
    ) -> Result<String, DomainError> {
        let mut builder = GenerationRequest::builder(build_prompt(query, documents, conversation))
            .system(ANSWER_SYSTEM_PROMPT)
            .temperature(self.config.answer_temperature);
        if let Some(max_tokens) = self.config.max_answer_tokens {
            builder = builder.max_tokens(max_tokens);
        }

        let answer = with_timeout(
            "answer generation",
            Duration::from_millis(self.config.generation_timeout_ms),
            self.llm.generate(builder.build()),
        )
        .await?;

        Ok(answer.trim().to_string())
    }

    async fn remember(&self, session_id: Option<&str>, query: &str, answer: &RagAnswer) {
        if let (Some(session), Some(memory)) = (session_id, &self.memory) {
            memory
                .record(
                    session,
                    query,
                    &answer.answer,
                    answer.query_type,
                    answer.sources.len(),
                )
                .await;
        }
    }
}

fn build_prompt(query: &str, documents: &[RetrievedDocument], conversation: Option<&str>) -> String {
    let mut prompt = String::from("Context:\n");

    if documents.is_empty() {
        prompt.push_str("(no documents found)\n");
    }
    for (i, document) in documents.iter().enumerate() {
        prompt.push_str(&format!("[{}] {}\n", i + 1, document.content.trim()));
    }

    match conversation {
        Some(conversation) => prompt.push_str(&format!("\n{}\n\nAnswer:", conversation)),
        None => prompt.push_str(&format!("\nQuestion: {}\n\nAnswer:", query)),
    }

    prompt
}
