use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::MemoryConfig;
use crate::domain::{Clock, GenerationRequest, LlmProvider, QueryType, SystemClock};
use crate::infrastructure::timeout::with_timeout;

/// Characters of each past response carried into the context
const RESPONSE_PREVIEW_CHARS: usize = 200;

const SUMMARY_PROMPT: &str = "Summarize this conversation in 2-3 sentences, focusing on key topics and decisions:

{conversation}

Summary:";

/// One query/response pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub timestamp: DateTime<Utc>,
    pub query: String,
    pub response: String,
    pub query_type: Option<QueryType>,
    pub document_count: usize,
}

/// A query prefixed with conversation context
#[derive(Debug, Clone, PartialEq)]
pub struct ContextualQuery {
    pub query: String,
    /// Length of the prepended context; zero when there was none
    pub context_length: usize,
}

#[derive(Debug, Default)]
struct Session {
    exchanges: VecDeque<Exchange>,
    summary: Option<String>,
}

/// Per-session conversation log with one-shot LLM summarization
#[derive(Debug)]
pub struct ConversationMemory {
    llm: Option<Arc<dyn LlmProvider>>,
    clock: Arc<dyn Clock>,
    config: MemoryConfig,
    sessions: RwLock<HashMap<String, Session>>,
}

impl ConversationMemory {
    pub fn new(llm: Option<Arc<dyn LlmProvider>>, config: MemoryConfig) -> Self {
        info!(
            max_exchanges = config.max_exchanges,
            summarization = config.enable_summarization && llm.is_some(),
            "Conversation memory initialized"
        );

        Self {
            llm,
            clock: Arc::new(SystemClock),
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Appends an exchange, trimming to `max_exchanges` and summarizing once
    /// the threshold is reached
    pub async fn record(
        &self,
        session_id: &str,
        query: &str,
        response: &str,
        query_type: Option<QueryType>,
        document_count: usize,
    ) {
        let exchange = Exchange {
            timestamp: self.clock.now(),
            query: query.to_string(),
            response: response.to_string(),
            query_type,
            document_count,
        };

        let transcript = {
            let mut sessions = self.sessions.write().await;
            let session = sessions.entry(session_id.to_string()).or_default();

            session.exchanges.push_back(exchange);
            while session.exchanges.len() > self.config.max_exchanges.max(1) {
                session.exchanges.pop_front();
            }

            let due = self.config.enable_summarization
                && session.summary.is_none()
                && session.exchanges.len() >= self.config.summarization_threshold;
            due.then(|| render_transcript(&session.exchanges))
        };

        if let Some(transcript) = transcript {
            self.summarize(session_id, transcript).await;
        }
    }

    /// Builds an enhanced query from the summary and the last `max_exchanges` exchanges
    pub async fn context_for(&self, session_id: &str, query: &str, max_exchanges: usize) -> ContextualQuery {
        let sessions = self.sessions.read().await;

        let Some(session) = sessions.get(session_id).filter(|s| !s.exchanges.is_empty()) else {
            return ContextualQuery {
                query: query.to_string(),
                context_length: 0,
            };
        };

        let mut parts = Vec::new();
        if let Some(ref summary) = session.summary {
            parts.push(format!("Previous conversation summary: {}", summary));
        }

        let skip = session.exchanges.len().saturating_sub(max_exchanges);
        for exchange in session.exchanges.iter().skip(skip) {
            parts.push(format!("User: {}", exchange.query));
            parts.push(format!("Assistant: {}", preview(&exchange.response)));
        }

        let context = parts.join("\n");
        ContextualQuery {
            query: format!("{}\n\nCurrent question: {}", context, query),
            context_length: context.len(),
        }
    }

    /// The last `last_n` exchanges, oldest first
    pub async fn history(&self, session_id: &str, last_n: usize) -> Vec<Exchange> {
        let sessions = self.sessions.read().await;

        sessions
            .get(session_id)
            .map(|session| {
                let skip = session.exchanges.len().saturating_sub(last_n);
                session.exchanges.iter().skip(skip).cloned().collect()
            })
            .unwrap_or_default()
    }

    pub async fn summary(&self, session_id: &str) -> Option<String> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .and_then(|s| s.summary.clone())
    }

    pub async fn len(&self, session_id: &str) -> usize {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map_or(0, |s| s.exchanges.len())
    }

    pub async fn clear(&self, session_id: &str) {
        self.sessions.write().await.remove(session_id);
        info!(session_id, "Conversation memory cleared");
    }

    pub async fn clear_all(&self) {
        self.sessions.write().await.clear();
        info!("All conversation memory cleared");
    }

    async fn summarize(&self, session_id: &str, transcript: String) {
        let Some(ref llm) = self.llm else {
            return;
        };

        let request = GenerationRequest::new(SUMMARY_PROMPT.replace("{conversation}", &transcript));
        let timeout = Duration::from_millis(self.config.summarization_timeout_ms);

        match with_timeout("conversation summary", timeout, llm.generate(request)).await {
            Ok(summary) => {
                let mut sessions = self.sessions.write().await;
                // The session may have been cleared while summarizing
                if let Some(session) = sessions.get_mut(session_id) {
                    session.summary.get_or_insert_with(|| summary.trim().to_string());
                    debug!(session_id, "Conversation summarized");
                }
            }
            Err(e) => warn!(session_id, error = %e, "Conversation summarization failed"),
        }
    }
}

fn render_transcript(exchanges: &VecDeque<Exchange>) -> String {
    exchanges
        .iter()
        .flat_map(|e| [format!("User: {}", e.query), format!("Assistant: {}", e.response)])
        .collect::<Vec<_>>()
        .join("\n")
}

fn preview(response: &str) -> String {
    match response.char_indices().nth(RESPONSE_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &response[..cut]),
        None => response.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::MockLlmProvider;

    const SESSION: &str = "session-1";

    fn memory(llm: Option<MockLlmProvider>, config: MemoryConfig) -> ConversationMemory {
        ConversationMemory::new(
            llm.map(|l| Arc::new(l) as Arc<dyn LlmProvider>),
            config,
        )
    }

    #[tokio::test]
    async fn test_empty_context_returns_query() {
        let memory = memory(None, MemoryConfig::default());

        let context = memory.context_for(SESSION, "What is X?", 3).await;

        assert_eq!(context.query, "What is X?");
        assert_eq!(context.context_length, 0);
    }

    #[tokio::test]
    async fn test_context_uses_recent_exchanges() {
        let memory = memory(None, MemoryConfig::default());
        for i in 1..=4 {
            memory
                .record(SESSION, &format!("q{}", i), &format!("a{}", i), None, 1)
                .await;
        }

        let context = memory.context_for(SESSION, "q5", 2).await;

        assert_eq!(
            context.query,
            "User: q3\nAssistant: a3\nUser: q4\nAssistant: a4\n\nCurrent question: q5"
        );
        assert_eq!(context.context_length, "User: q3\nAssistant: a3\nUser: q4\nAssistant: a4".len());
    }

    #[tokio::test]
    async fn test_long_responses_truncated() {
        let memory = memory(None, MemoryConfig::default());
        memory.record(SESSION, "q", &"x".repeat(500), None, 0).await;

        let context = memory.context_for(SESSION, "next", 3).await;

        assert!(context.query.contains(&format!("Assistant: {}...", "x".repeat(200))));
        assert!(!context.query.contains(&"x".repeat(201)));
    }

    #[tokio::test]
    async fn test_trims_to_max_exchanges() {
        let config = MemoryConfig {
            max_exchanges: 3,
            enable_summarization: false,
            ..Default::default()
        };
        let memory = memory(None, config);

        for i in 0..5 {
            memory.record(SESSION, &format!("q{}", i), "a", None, 0).await;
        }

        let history = memory.history(SESSION, 10).await;
        assert_eq!(memory.len(SESSION).await, 3);
        assert_eq!(history.first().unwrap().query, "q2");
        assert_eq!(memory.history(SESSION, 1).await[0].query, "q4");
    }

    #[tokio::test]
    async fn test_summarizes_once_at_threshold() {
        let llm = Arc::new(MockLlmProvider::new("mock").with_response(" Talked about leave. "));
        let memory = ConversationMemory::new(Some(llm.clone()), MemoryConfig::default());

        for i in 0..4 {
            memory.record(SESSION, &format!("q{}", i), "a", None, 0).await;
        }
        assert!(memory.summary(SESSION).await.is_none());

        memory.record(SESSION, "q4", "a", None, 0).await;
        memory.record(SESSION, "q5", "a", None, 0).await;

        assert_eq!(memory.summary(SESSION).await.as_deref(), Some("Talked about leave."));
        assert_eq!(llm.call_count(), 1);
        assert!(llm.prompts()[0].contains("User: q0\nAssistant: a"));

        let context = memory.context_for(SESSION, "next", 1).await;
        assert!(context.query.starts_with("Previous conversation summary: Talked about leave."));
    }

    #[tokio::test]
    async fn test_summarization_failure_ignored() {
        let memory = memory(
            Some(MockLlmProvider::new("mock").with_error("down")),
            MemoryConfig::default(),
        );

        for i in 0..6 {
            memory.record(SESSION, &format!("q{}", i), "a", None, 0).await;
        }

        assert!(memory.summary(SESSION).await.is_none());
        assert_eq!(memory.len(SESSION).await, 6);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated_and_clearable() {
        let memory = memory(None, MemoryConfig::default());
        memory
            .record("a", "q", "r", Some(QueryType::Factual), 2)
            .await;
        memory.record("b", "q", "r", None, 0).await;

        memory.clear("a").await;

        assert_eq!(memory.len("a").await, 0);
        assert_eq!(memory.len("b").await, 1);

        memory.clear_all().await;
        assert!(memory.history("b", 5).await.is_empty());
    }
}
