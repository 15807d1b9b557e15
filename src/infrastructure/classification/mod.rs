//! Query classifier implementations

mod heuristic;
mod llm;

pub use heuristic::HeuristicQueryClassifier;
pub use llm::LlmQueryClassifier;

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{LlmProvider, QueryClassifier};

/// Which classifier to build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    #[default]
    Llm,
    Heuristic,
}

/// Classifier configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub kind: ClassifierKind,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    5_000
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            kind: ClassifierKind::default(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl ClassifierConfig {
    pub fn create(&self, llm: Arc<dyn LlmProvider>) -> Arc<dyn QueryClassifier> {
        match self.kind {
            ClassifierKind::Llm => Arc::new(LlmQueryClassifier::new(
                llm,
                Duration::from_millis(self.timeout_ms),
            )),
            ClassifierKind::Heuristic => Arc::new(HeuristicQueryClassifier::new()),
        }
    }
}
