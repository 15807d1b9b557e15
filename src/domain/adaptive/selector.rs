//! Query type to feature profile mapping

use std::sync::Arc;

use super::AdaptiveFeatureProfile;
use crate::domain::query::QueryType;

/// Immutable table holding one profile per query type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureProfileTable {
    profiles: [AdaptiveFeatureProfile; 5],
}

impl FeatureProfileTable {
    /// Builds a table from explicit profiles; types left out keep their default profile
    pub fn with_overrides(
        overrides: impl IntoIterator<Item = (QueryType, AdaptiveFeatureProfile)>,
    ) -> Self {
        let mut table = Self::default();
        for (query_type, profile) in overrides {
            table.profiles[Self::slot(query_type)] = profile;
        }
        table
    }

    pub fn get(&self, query_type: QueryType) -> &AdaptiveFeatureProfile {
        &self.profiles[Self::slot(query_type)]
    }

    fn slot(query_type: QueryType) -> usize {
        match query_type {
            QueryType::Factual => 0,
            QueryType::Procedural => 1,
            QueryType::Temporal => 2,
            QueryType::Comparative => 3,
            QueryType::Complex => 4,
        }
    }
}

impl Default for FeatureProfileTable {
    fn default() -> Self {
        // Ordered by `slot`
        let profiles = [
            AdaptiveFeatureProfile::builtin(false, false, 1, 3, "Simple factual lookups - optimized for speed"),
            AdaptiveFeatureProfile::builtin(true, true, 2, 4, "Process queries - balanced speed/accuracy"),
            AdaptiveFeatureProfile::builtin(false, true, 2, 3, "Time-based queries - optimized for precision"),
            AdaptiveFeatureProfile::builtin(true, true, 3, 5, "Comparative analysis - balanced approach"),
            AdaptiveFeatureProfile::builtin(true, true, 4, 5, "Complex queries - maximum accuracy"),
        ];

        Self { profiles }
    }
}

/// Maps a query type to its retrieval feature profile. Always succeeds.
#[derive(Debug, Clone, Default)]
pub struct AdaptiveFeatureSelector {
    table: Arc<FeatureProfileTable>,
}

impl AdaptiveFeatureSelector {
    pub fn new(table: FeatureProfileTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }

    pub fn select(&self, query_type: QueryType) -> &AdaptiveFeatureProfile {
        self.table.get(query_type)
    }

    /// Selects by raw label; unknown labels get the `complex` profile
    pub fn select_label(&self, label: &str) -> &AdaptiveFeatureProfile {
        let query_type = label.parse().unwrap_or(QueryType::Complex);
        self.select(query_type)
    }
}
