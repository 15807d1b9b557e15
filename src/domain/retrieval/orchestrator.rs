//! Retrieval orchestrator trait and document type

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// A retrieved document with its relevance score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    /// Stable identifier, used by the cache overlap gate
    pub id: String,
    pub content: String,
    /// Relevance score (0.0 - 1.0)
    pub score: f32,
}

impl RetrievedDocument {
    pub fn new(id: impl Into<String>, content: impl Into<String>, score: f32) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            score,
        }
    }
}

/// Runs the vector search and reranking for one or more query strings
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RetrievalOrchestrator: Send + Sync {
    /// Retrieves up to `top_k` documents for the given queries, best first
    async fn retrieve(
        &self,
        queries: &[String],
        top_k: usize,
    ) -> Result<Vec<RetrievedDocument>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_orchestrator() {
        let mut mock = MockRetrievalOrchestrator::new();
        mock.expect_retrieve()
            .withf(|queries, top_k| queries.len() == 1 && *top_k == 3)
            .returning(|_, _| Ok(vec![RetrievedDocument::new("d1", "content", 0.9)]));

        let docs = mock.retrieve(&["q".to_string()], 3).await.unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "d1");
    }
}
