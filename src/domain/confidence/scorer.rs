//! Multi-signal confidence scorer for generated answers

use serde::{Deserialize, Serialize};

use crate::domain::retrieval::RetrievedDocument;

const RETRIEVAL_WEIGHT: f32 = 0.30;
const COMPLETENESS_WEIGHT: f32 = 0.30;
const ALIGNMENT_WEIGHT: f32 = 0.25;
const CONSISTENCY_WEIGHT: f32 = 0.15;

/// Score used for alignment when no similarity is available
const NEUTRAL_ALIGNMENT: f32 = 50.0;

/// Interpretation of an overall score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl ConfidenceLevel {
    pub fn from_score(score: f32) -> Self {
        if score >= 85.0 {
            Self::VeryHigh
        } else if score >= 60.0 {
            Self::High
        } else if score >= 30.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Individual signal scores, each 0-100
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceSignals {
    pub retrieval_quality: f32,
    pub answer_completeness: f32,
    pub semantic_alignment: f32,
    pub consistency: f32,
}

/// Overall confidence with its breakdown
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceScore {
    /// Weighted score, 0-100
    pub overall: f32,
    pub level: ConfidenceLevel,
    pub signals: ConfidenceSignals,
}

/// Scores how trustworthy an answer is from its sources and shape
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfidenceScorer;

impl ConfidenceScorer {
    pub fn new() -> Self {
        Self
    }

    /// Scores an answer.
    ///
    /// `alignment` is the mean cosine similarity between the answer and its
    /// top documents, when embeddings are available.
    pub fn score(
        &self,
        answer: &str,
        documents: &[RetrievedDocument],
        alignment: Option<f32>,
    ) -> ConfidenceScore {
        let signals = ConfidenceSignals {
            retrieval_quality: Self::retrieval_quality(documents),
            answer_completeness: Self::completeness(answer),
            semantic_alignment: alignment
                .filter(|_| !documents.is_empty())
                .map(Self::alignment)
                .unwrap_or(NEUTRAL_ALIGNMENT),
            consistency: Self::consistency(documents.len()),
        };

        let overall = signals.retrieval_quality * RETRIEVAL_WEIGHT
            + signals.answer_completeness * COMPLETENESS_WEIGHT
            + signals.semantic_alignment * ALIGNMENT_WEIGHT
            + signals.consistency * CONSISTENCY_WEIGHT;

        ConfidenceScore {
            overall,
            level: ConfidenceLevel::from_score(overall),
            signals,
        }
    }

    /// Mean of the top three retrieval scores, scaled to 0-100
    fn retrieval_quality(documents: &[RetrievedDocument]) -> f32 {
        let top: Vec<f32> = documents.iter().take(3).map(|d| d.score).collect();
        if top.is_empty() {
            return 0.0;
        }

        let mean = top.iter().sum::<f32>() / top.len() as f32;
        (mean * 100.0).clamp(0.0, 100.0)
    }

    fn completeness(answer: &str) -> f32 {
        let words: Vec<&str> = answer.split_whitespace().collect();
        let word_count = words.len() as f32;

        let length_score = if words.len() < 10 {
            word_count * 5.0
        } else if words.len() < 50 {
            50.0 + (word_count - 10.0)
        } else {
            (90.0 + (word_count - 50.0) * 0.2).min(100.0)
        };

        let mut specificity: f32 = 50.0;

        if answer.chars().any(|c| c.is_ascii_digit()) {
            specificity += 15.0;
        }

        // Capitalized words mid-sentence suggest names and specific terms
        if words.len() > 3 {
            let capitalized = words[1..words.len() - 1]
                .iter()
                .filter(|w| w.chars().next().is_some_and(char::is_uppercase))
                .count();
            specificity += (capitalized as f32 * 5.0).min(20.0);
        }

        if answer.contains('[') && answer.contains(']') {
            specificity += 15.0;
        }

        (length_score * 0.6 + specificity * 0.4).min(100.0)
    }

    /// Similarity is typically 0.3-0.9; map that band onto 0-100
    fn alignment(similarity: f32) -> f32 {
        ((similarity - 0.3) / 0.6 * 100.0).clamp(0.0, 100.0)
    }

    fn consistency(document_count: usize) -> f32 {
        match document_count {
            n if n >= 5 => 100.0,
            3 | 4 => 80.0,
            2 => 60.0,
            1 => 40.0,
            _ => 20.0,
        }
    }
}
