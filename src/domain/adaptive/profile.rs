//! Per-query-type feature profiles

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Retrieval feature configuration for one query type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdaptiveFeatureProfile {
    /// Run HyDE expansion
    pub enable_expansion: bool,
    /// Run multi-query rewriting
    pub enable_multi_query: bool,
    /// Target number of rewritten variants (>= 1)
    pub num_query_variants: usize,
    /// Documents passed to the reranker (>= 1)
    pub rerank_document_count: usize,
    pub description: String,
}

impl AdaptiveFeatureProfile {
    pub fn new(
        enable_expansion: bool,
        enable_multi_query: bool,
        num_query_variants: usize,
        rerank_document_count: usize,
        description: impl Into<String>,
    ) -> Result<Self, DomainError> {
        if num_query_variants == 0 {
            return Err(DomainError::validation(
                "num_query_variants must be at least 1",
            ));
        }
        if rerank_document_count == 0 {
            return Err(DomainError::validation(
                "rerank_document_count must be at least 1",
            ));
        }

        Ok(Self {
            enable_expansion,
            enable_multi_query,
            num_query_variants,
            rerank_document_count,
            description: description.into(),
        })
    }

    pub(crate) fn builtin(
        enable_expansion: bool,
        enable_multi_query: bool,
        num_query_variants: usize,
        rerank_document_count: usize,
        description: &str,
    ) -> Self {
        Self {
            enable_expansion,
            enable_multi_query,
            num_query_variants,
            rerank_document_count,
            description: description.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_zero_counts() {
        assert!(AdaptiveFeatureProfile::new(true, true, 0, 3, "x").is_err());
        assert!(AdaptiveFeatureProfile::new(true, true, 2, 0, "x").is_err());
        assert!(AdaptiveFeatureProfile::new(false, false, 1, 1, "x").is_ok());
    }
}
