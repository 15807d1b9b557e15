//! Transformed query list

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::domain::query::QueryType;

/// Ordered, de-duplicated queries to retrieve against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformedQueries {
    /// Never empty; always contains the original query
    pub queries: Vec<String>,
    /// Classified type, when the pipeline classified the query
    pub query_type: Option<QueryType>,
}

impl TransformedQueries {
    /// Builds the final list: de-duplicates and guarantees `original` is present
    pub fn assemble(original: &str, candidates: Vec<String>, query_type: Option<QueryType>) -> Self {
        let mut queries = dedupe(candidates);

        let original_key = dedupe_key(original);
        if !queries.iter().any(|q| dedupe_key(q) == original_key) {
            queries.insert(0, original.to_string());
        }

        Self {
            queries,
            query_type,
        }
    }

    /// Just the original query
    pub fn original_only(original: &str, query_type: Option<QueryType>) -> Self {
        Self {
            queries: vec![original.to_string()],
            query_type,
        }
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

fn dedupe_key(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Removes case-insensitive, whitespace-trimmed duplicates, keeping first-seen order
pub fn dedupe(queries: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    queries
        .into_iter()
        .filter(|q| !q.trim().is_empty())
        .filter(|q| seen.insert(dedupe_key(q)))
        .collect()
}
