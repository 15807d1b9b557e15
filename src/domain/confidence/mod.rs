//! Answer confidence scoring

mod scorer;

pub use scorer::{ConfidenceLevel, ConfidenceScore, ConfidenceScorer, ConfidenceSignals};
