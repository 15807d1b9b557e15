//! Query transformation pipeline

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::expander::{HydeExpander, MultiQueryRewriter};
use super::TransformationConfig;
use crate::domain::{
    AdaptiveFeatureProfile, AdaptiveFeatureSelector, LlmProvider, QueryClassifier, QueryType,
    TransformedQueries,
};

/// Turns one query into the list of queries to retrieve against.
///
/// Expansion and rewriting run concurrently. Any LLM failure shrinks the list
/// but the original query is always present.
#[derive(Debug, Clone)]
pub struct QueryTransformationPipeline {
    hyde: HydeExpander,
    rewriter: MultiQueryRewriter,
    classifier: Arc<dyn QueryClassifier>,
    selector: AdaptiveFeatureSelector,
    config: TransformationConfig,
}

impl QueryTransformationPipeline {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        classifier: Arc<dyn QueryClassifier>,
        selector: AdaptiveFeatureSelector,
        config: TransformationConfig,
    ) -> Self {
        let timeout = Duration::from_millis(config.llm_timeout_ms);

        Self {
            hyde: HydeExpander::new(llm.clone(), timeout)
                .with_temperature(config.expansion_temperature),
            rewriter: MultiQueryRewriter::new(llm, timeout, config.min_variant_length),
            classifier,
            selector,
            config,
        }
    }

    pub fn selector(&self) -> &AdaptiveFeatureSelector {
        &self.selector
    }

    /// Transforms `query` under an explicit profile
    pub async fn transform(&self, query: &str, profile: &AdaptiveFeatureProfile) -> TransformedQueries {
        self.run(query, profile, None).await
    }

    /// Classifies `query`, selects its profile, then transforms
    pub async fn transform_adaptive(&self, query: &str) -> TransformedQueries {
        let query_type = self.classifier.classify(query).await;
        let profile = self.selector.select(query_type);

        info!(
            query_type = %query_type,
            expansion = profile.enable_expansion,
            multi_query = profile.enable_multi_query,
            variants = profile.num_query_variants,
            "Selected adaptive feature profile"
        );

        self.run(query, profile, Some(query_type)).await
    }

    async fn run(
        &self,
        query: &str,
        profile: &AdaptiveFeatureProfile,
        query_type: Option<QueryType>,
    ) -> TransformedQueries {
        if query.trim().is_empty() {
            return TransformedQueries::original_only(query, query_type);
        }

        let use_expansion = self.config.enable_expansion && profile.enable_expansion;
        // One variant is the original query itself
        let use_multi_query = self.config.enable_multi_query
            && profile.enable_multi_query
            && profile.num_query_variants > 1;

        let (hypothetical, variants) = tokio::join!(
            async {
                if use_expansion {
                    self.hyde.expand(query).await
                } else {
                    None
                }
            },
            async {
                if use_multi_query {
                    self.rewriter.rewrite(query, profile.num_query_variants).await
                } else {
                    Vec::new()
                }
            }
        );

        let mut candidates = Vec::with_capacity(2 + variants.len());
        candidates.extend(hypothetical);
        candidates.push(query.to_string());
        candidates.extend(variants);

        let transformed = TransformedQueries::assemble(query, candidates, query_type);
        info!(
            count = transformed.len(),
            query_type = query_type.map(|qt| qt.as_str()).unwrap_or("unclassified"),
            "Transformed query"
        );

        transformed
    }
}
