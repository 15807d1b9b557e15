//! LLM-backed query classifier

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::{
    ClassificationSource, GenerationRequest, LlmProvider, QueryClassification, QueryClassifier,
    QueryType,
};
use crate::infrastructure::observability::record_classification;
use crate::infrastructure::timeout::with_timeout;

const CLASSIFICATION_PROMPT: &str = r#"Classify the following question into ONE of these categories:

1. FACTUAL - Simple fact lookups (e.g., "How many days of leave?", "What is the passing score?")
2. PROCEDURAL - Process or steps (e.g., "What is the process for...", "How do I...")
3. TEMPORAL - Time-based rules or timelines (e.g., "When can...", "How long...", "What is the timeline...")
4. COMPARATIVE - Comparisons or differences (e.g., "What are the differences between...", "How does X compare to Y...")
5. COMPLEX - Multi-part questions requiring multiple pieces of information

Question: {query}

Classification (respond with just the category name):"#;

/// Labels the model may answer with, as they appear in the prompt
const LABELS: [(&str, QueryType); 5] = [
    ("FACTUAL", QueryType::Factual),
    ("PROCEDURAL", QueryType::Procedural),
    ("TEMPORAL", QueryType::Temporal),
    ("COMPARATIVE", QueryType::Comparative),
    ("COMPLEX", QueryType::Complex),
];

/// Asks an LLM for one closed-vocabulary label.
///
/// Errors, timeouts and unrecognised answers all yield `complex`; the call is
/// never retried.
#[derive(Debug)]
pub struct LlmQueryClassifier {
    llm: Arc<dyn LlmProvider>,
    timeout: Duration,
}

impl LlmQueryClassifier {
    pub fn new(llm: Arc<dyn LlmProvider>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    fn build_request(query: &str) -> GenerationRequest {
        GenerationRequest::builder(CLASSIFICATION_PROMPT.replace("{query}", query))
            .temperature(0.0)
            .max_tokens(10)
            .build()
    }

    async fn classify_inner(&self, query: &str) -> QueryClassification {
        let response = match with_timeout(
            "query classification",
            self.timeout,
            self.llm.generate(Self::build_request(query)),
        )
        .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, provider = self.llm.provider_name(), "Query classification failed, defaulting to complex");
                return QueryClassification::fallback(e.to_string());
            }
        };

        match parse_label(&response) {
            Some(query_type) => {
                QueryClassification::new(query_type, ClassificationSource::Llm)
                    .with_signal(format!("llm_label:{}", query_type), 1.0)
            }
            None => {
                warn!(response = %response.trim(), "Unrecognised classification label, defaulting to complex");
                QueryClassification::fallback("unrecognised label")
            }
        }
    }
}

/// Earliest known label in the response, case-insensitive
pub(crate) fn parse_label(response: &str) -> Option<QueryType> {
    let upper = response.to_uppercase();

    LABELS
        .iter()
        .filter_map(|(label, query_type)| upper.find(label).map(|pos| (pos, *query_type)))
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, query_type)| query_type)
}

#[async_trait]
impl QueryClassifier for LlmQueryClassifier {
    async fn classify_with_signals(&self, query: &str) -> QueryClassification {
        let classification = self.classify_inner(query).await;

        record_classification(classification.query_type, classification.source);
        debug!(
            query_type = %classification.query_type,
            source = ?classification.source,
            "Classified query"
        );

        classification
    }

    fn classifier_name(&self) -> &'static str {
        "llm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::MockLlmProvider;

    fn classifier(llm: MockLlmProvider) -> LlmQueryClassifier {
        LlmQueryClassifier::new(Arc::new(llm), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_maps_each_label() {
        for (answer, expected) in [
            ("FACTUAL", QueryType::Factual),
            ("procedural", QueryType::Procedural),
            (" Temporal\n", QueryType::Temporal),
            ("Category: COMPARATIVE", QueryType::Comparative),
            ("COMPLEX", QueryType::Complex),
        ] {
            let classification = classifier(MockLlmProvider::new("mock").with_response(answer))
                .classify_with_signals("anything")
                .await;

            assert_eq!(classification.query_type, expected, "answer {:?}", answer);
            assert_eq!(classification.source, ClassificationSource::Llm);
        }
    }

    #[tokio::test]
    async fn test_first_label_in_response_wins() {
        let llm = MockLlmProvider::new("mock").with_response("PROCEDURAL (not FACTUAL)");

        assert_eq!(classifier(llm).classify("q").await, QueryType::Procedural);
    }

    #[tokio::test]
    async fn test_unrecognised_label_falls_back() {
        let llm = MockLlmProvider::new("mock").with_response("I think it's a question");

        let classification = classifier(llm).classify_with_signals("q").await;

        assert_eq!(classification.query_type, QueryType::Complex);
        assert!(classification.is_fallback());
    }

    #[tokio::test]
    async fn test_llm_error_falls_back_to_complex() {
        let llm = MockLlmProvider::new("mock").with_error("connection refused");

        let classification = classifier(llm).classify_with_signals("q").await;

        assert_eq!(classification.query_type, QueryType::Complex);
        assert!(classification.is_fallback());
    }

    #[tokio::test]
    async fn test_timeout_falls_back_to_complex() {
        let llm = MockLlmProvider::new("mock")
            .with_response("FACTUAL")
            .with_delay(Duration::from_millis(200));
        let classifier = LlmQueryClassifier::new(Arc::new(llm), Duration::from_millis(10));

        assert_eq!(classifier.classify("q").await, QueryType::Complex);
    }

    #[tokio::test]
    async fn test_prompt_contains_query_and_is_not_retried() {
        let llm = Arc::new(MockLlmProvider::new("mock").with_error("boom"));
        let classifier = LlmQueryClassifier::new(llm.clone(), Duration::from_secs(1));

        classifier.classify("How many days of leave?").await;

        assert_eq!(llm.call_count(), 1);
        assert!(llm.prompts()[0].contains("Question: How many days of leave?"));
    }
}
