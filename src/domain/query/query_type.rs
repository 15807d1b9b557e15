//! Query type labels and classification results

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Closed set of query types driving adaptive retrieval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    /// Simple fact lookups ("How many days of leave?")
    Factual,
    /// Process or steps ("What are the steps to apply for leave?")
    Procedural,
    /// Time-based rules or timelines ("When is the deadline?")
    Temporal,
    /// Comparisons or differences between things
    Comparative,
    /// Multi-part, ambiguous, or unclear intent
    Complex,
}

impl QueryType {
    pub const ALL: [QueryType; 5] = [
        QueryType::Factual,
        QueryType::Procedural,
        QueryType::Temporal,
        QueryType::Comparative,
        QueryType::Complex,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Factual => "factual",
            QueryType::Procedural => "procedural",
            QueryType::Temporal => "temporal",
            QueryType::Comparative => "comparative",
            QueryType::Complex => "complex",
        }
    }
}

impl Default for QueryType {
    fn default() -> Self {
        Self::Complex
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "factual" => Ok(QueryType::Factual),
            "procedural" => Ok(QueryType::Procedural),
            "temporal" => Ok(QueryType::Temporal),
            "comparative" => Ok(QueryType::Comparative),
            "complex" => Ok(QueryType::Complex),
            other => Err(DomainError::classification(format!(
                "Unknown query type: {}",
                other
            ))),
        }
    }
}

/// Where a classification came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    Llm,
    Heuristic,
    /// The classifier failed and the result is the `complex` default
    Fallback,
}

/// Result of classifying one query. Never persisted beyond the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryClassification {
    pub query_type: QueryType,
    /// Factor name to contribution, for explainability only
    pub confidence_signals: BTreeMap<String, f32>,
    pub source: ClassificationSource,
}

impl QueryClassification {
    pub fn new(query_type: QueryType, source: ClassificationSource) -> Self {
        Self {
            query_type,
            confidence_signals: BTreeMap::new(),
            source,
        }
    }

    /// The `complex` default used whenever classification fails
    pub fn fallback(reason: impl Into<String>) -> Self {
        let mut classification = Self::new(QueryType::Complex, ClassificationSource::Fallback);
        classification
            .confidence_signals
            .insert(format!("fallback: {}", reason.into()), 1.0);
        classification
    }

    pub fn with_signal(mut self, name: impl Into<String>, contribution: f32) -> Self {
        self.confidence_signals.insert(name.into(), contribution);
        self
    }

    pub fn is_fallback(&self) -> bool {
        self.source == ClassificationSource::Fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_type_round_trips_through_str() {
        for query_type in QueryType::ALL {
            assert_eq!(query_type.as_str().parse::<QueryType>().unwrap(), query_type);
        }
    }

    #[test]
    fn test_query_type_from_str_case_insensitive() {
        assert_eq!(" FACTUAL ".parse::<QueryType>().unwrap(), QueryType::Factual);
        assert!("unknown".parse::<QueryType>().is_err());
    }

    #[test]
    fn test_default_is_complex() {
        assert_eq!(QueryType::default(), QueryType::Complex);
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&QueryType::Comparative).unwrap();
        assert_eq!(json, "\"comparative\"");
    }

    #[test]
    fn test_fallback_classification() {
        let classification = QueryClassification::fallback("timeout");

        assert_eq!(classification.query_type, QueryType::Complex);
        assert!(classification.is_fallback());
        assert!(classification.confidence_signals.contains_key("fallback: timeout"));
    }
}
