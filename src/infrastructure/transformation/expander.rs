//! LLM-backed query expansion: hypothetical answers and paraphrases

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::transformation::parse_variants;
use crate::domain::{GenerationRequest, LlmProvider};
use crate::infrastructure::timeout::with_timeout;

const HYDE_PROMPT: &str = "You are an expert on the documents in this knowledge base. Given a question, \
write a hypothetical, detailed answer as it would appear in an official document. Use formal language, \
specific numbers, timeframes, and precise terminology.

Question: {query}

Write a comprehensive hypothetical answer (2-3 sentences) that directly addresses this question:";

const REWRITE_PROMPT: &str = "You are an expert at reformulating questions for searching formal documents. \
Given a user's question, generate {n} different reformulations that:

1. Use formal terminology and the language of official documents
2. Include specific keywords likely to appear in the source text
3. Convert conversational phrasing to document-appropriate phrasing
4. Add context about relevant rules or programs

Original Question: {query}

Generate {n} reformulated queries, one per line, focusing on different aspects or phrasings:

1.";

/// Writes a hypothetical answer passage to retrieve against
#[derive(Debug, Clone)]
pub struct HydeExpander {
    llm: Arc<dyn LlmProvider>,
    timeout: Duration,
    temperature: f32,
}

impl HydeExpander {
    pub fn new(llm: Arc<dyn LlmProvider>, timeout: Duration) -> Self {
        Self {
            llm,
            timeout,
            temperature: 0.3,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// The hypothetical passage, or `None` when generation fails
    pub async fn expand(&self, query: &str) -> Option<String> {
        let request = GenerationRequest::builder(HYDE_PROMPT.replace("{query}", query))
            .temperature(self.temperature)
            .build();

        match with_timeout("hyde expansion", self.timeout, self.llm.generate(request)).await {
            Ok(text) if !text.trim().is_empty() => {
                debug!(query, hypothetical = %text.trim(), "Generated hypothetical document");
                Some(text.trim().to_string())
            }
            Ok(_) => {
                warn!(query, "Expansion returned empty text, using original query");
                None
            }
            Err(e) => {
                warn!(query, error = %e, "Expansion failed, using original query");
                None
            }
        }
    }
}

/// Generates paraphrases of a query from a numbered-list completion
#[derive(Debug, Clone)]
pub struct MultiQueryRewriter {
    llm: Arc<dyn LlmProvider>,
    timeout: Duration,
    min_variant_length: usize,
}

impl MultiQueryRewriter {
    pub fn new(llm: Arc<dyn LlmProvider>, timeout: Duration, min_variant_length: usize) -> Self {
        Self {
            llm,
            timeout,
            min_variant_length,
        }
    }

    /// Up to `num_variants` paraphrases; just `[query]` when generation fails
    pub async fn rewrite(&self, query: &str, num_variants: usize) -> Vec<String> {
        let prompt = REWRITE_PROMPT
            .replace("{n}", &num_variants.to_string())
            .replace("{query}", query);
        let request = GenerationRequest::new(prompt);

        match with_timeout("multi-query rewrite", self.timeout, self.llm.generate(request)).await {
            Ok(response) => {
                let variants =
                    parse_variants(&response, query, num_variants, self.min_variant_length);
                debug!(query, variants = ?variants, "Generated query variants");
                variants
            }
            Err(e) => {
                warn!(query, error = %e, "Multi-query rewrite failed, using original query");
                vec![query.to_string()]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::MockLlmProvider;

    #[tokio::test]
    async fn test_hyde_expansion() {
        let llm = Arc::new(
            MockLlmProvider::new("mock").with_response("  Members accrue 2.5 days of leave per month.  "),
        );
        let expander = HydeExpander::new(llm.clone(), Duration::from_secs(1));

        let passage = expander.expand("How much leave do I get?").await;

        assert_eq!(passage.as_deref(), Some("Members accrue 2.5 days of leave per month."));
        assert!(llm.prompts()[0].contains("Question: How much leave do I get?"));
    }

    #[tokio::test]
    async fn test_hyde_failure_is_none() {
        let llm = Arc::new(MockLlmProvider::new("mock").with_error("down"));

        assert!(HydeExpander::new(llm, Duration::from_secs(1)).expand("q").await.is_none());
    }

    #[tokio::test]
    async fn test_hyde_timeout_is_none() {
        let llm = Arc::new(
            MockLlmProvider::new("mock")
                .with_response("late")
                .with_delay(Duration::from_millis(200)),
        );

        let expander = HydeExpander::new(llm, Duration::from_millis(10));

        assert!(expander.expand("q").await.is_none());
    }

    #[tokio::test]
    async fn test_rewrite_parses_list() {
        let llm = Arc::new(MockLlmProvider::new("mock").with_response(
            "1. Annual leave accrual entitlement\n2. ok\n3) Authorized leave days per year\n- Leave balance maximum carryover",
        ));
        let rewriter = MultiQueryRewriter::new(llm.clone(), Duration::from_secs(1), 10);

        let variants = rewriter.rewrite("how much leave", 2).await;

        assert_eq!(
            variants,
            vec!["Annual leave accrual entitlement", "Authorized leave days per year"]
        );
        assert!(llm.prompts()[0].contains("generate 2 different reformulations"));
    }

    #[tokio::test]
    async fn test_rewrite_failure_returns_original() {
        let llm = Arc::new(MockLlmProvider::new("mock").with_error("down"));
        let rewriter = MultiQueryRewriter::new(llm, Duration::from_secs(1), 10);

        assert_eq!(rewriter.rewrite("how much leave", 3).await, vec!["how much leave"]);
    }
}
