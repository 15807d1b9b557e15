//! Query classification collaborator trait

use async_trait::async_trait;
use std::fmt::Debug;

use crate::domain::query::{QueryClassification, QueryType};

/// Assigns a [`QueryType`] to a query.
///
/// Implementations never fail: any internal error yields a
/// [`QueryClassification::fallback`] labelled `complex`.
#[async_trait]
pub trait QueryClassifier: Send + Sync + Debug {
    /// Classify with the signals that drove the decision
    async fn classify_with_signals(&self, query: &str) -> QueryClassification;

    /// Classify to a bare label
    async fn classify(&self, query: &str) -> QueryType {
        self.classify_with_signals(query).await.query_type
    }

    /// Classifier name for logs and metrics
    fn classifier_name(&self) -> &'static str;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use crate::domain::query::ClassificationSource;

    /// Classifier returning a fixed label
    #[derive(Debug)]
    pub struct MockQueryClassifier {
        query_type: QueryType,
    }

    impl MockQueryClassifier {
        pub fn new(query_type: QueryType) -> Self {
            Self { query_type }
        }
    }

    #[async_trait]
    impl QueryClassifier for MockQueryClassifier {
        async fn classify_with_signals(&self, _query: &str) -> QueryClassification {
            QueryClassification::new(self.query_type, ClassificationSource::Heuristic)
        }

        fn classifier_name(&self) -> &'static str {
            "mock"
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_classify_defaults_to_signals_label() {
            let classifier = MockQueryClassifier::new(QueryType::Temporal);
            assert_eq!(classifier.classify("when?").await, QueryType::Temporal);
        }
    }
}
