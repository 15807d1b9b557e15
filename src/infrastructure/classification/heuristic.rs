//! Deterministic keyword classifier

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::domain::{
    normalize, ClassificationSource, QueryClassification, QueryClassifier, QueryType,
};
use crate::infrastructure::observability::record_classification;

struct Cue {
    query_type: QueryType,
    pattern: Regex,
    weight: f32,
}

impl Cue {
    fn new(query_type: QueryType, pattern: &str, weight: f32) -> Self {
        Self {
            query_type,
            pattern: Regex::new(pattern).unwrap(),
            weight,
        }
    }
}

static CUES: Lazy<Vec<Cue>> = Lazy::new(|| {
    vec![
        Cue::new(
            QueryType::Factual,
            r"^(what|who|where|which|is|are|does|do|can|how many|how much)\b",
            1.0,
        ),
        Cue::new(
            QueryType::Factual,
            r"\b(how many|how much|what is the|number of|minimum|maximum)\b",
            1.0,
        ),
        Cue::new(
            QueryType::Procedural,
            r"\b(steps?|process|procedures?|how (do|can|should) (i|we|you)|how to|apply|submit|instructions?)\b",
            2.0,
        ),
        Cue::new(
            QueryType::Temporal,
            r"\b(when|how long|timeline|deadline|until|expire[sd]?|duration|how soon|how often)\b",
            2.0,
        ),
        Cue::new(
            QueryType::Comparative,
            r"\b(compared?|comparison|differences?|differ|versus|vs\.?|better|worse|contrast)\b|\bbetween\b.+\band\b",
            3.0,
        ),
        Cue::new(
            QueryType::Complex,
            r"\b(why|explain|analy[sz]e|evaluate|implications?)\b",
            2.0,
        ),
    ]
});

static INTERROGATIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(what|how|when|why|where|who|which)\b").unwrap());

/// Several questions in one query
const MULTI_PART_INTERROGATIVES: usize = 3;

/// Scores each type from keyword cues; no collaborator calls.
///
/// Zero scores, a tie for the top score, or a multi-part question give `complex`.
#[derive(Debug, Default)]
pub struct HeuristicQueryClassifier;

impl HeuristicQueryClassifier {
    pub fn new() -> Self {
        Self
    }

    fn score(query: &str) -> QueryClassification {
        let text = normalize(query);

        let mut scores = [0.0f32; 5];
        for cue in CUES.iter() {
            let matches = cue.pattern.find_iter(&text).count();
            scores[slot(cue.query_type)] += cue.weight * matches as f32;
        }

        let mut signals: Vec<(String, f32)> = QueryType::ALL
            .iter()
            .filter(|qt| scores[slot(**qt)] > 0.0)
            .map(|qt| (qt.as_str().to_string(), scores[slot(*qt)]))
            .collect();

        let questions = text.matches('?').count();
        let interrogatives = INTERROGATIVE.find_iter(&text).count();
        if questions > 1 || interrogatives >= MULTI_PART_INTERROGATIVES {
            signals.push(("multi_part".to_string(), 1.0));
            return with_signals(QueryType::Complex, signals);
        }

        let mut ranked: Vec<(QueryType, f32)> =
            QueryType::ALL.iter().map(|qt| (*qt, scores[slot(*qt)])).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        let (best, best_score) = ranked[0];
        let runner_up = ranked[1].1;

        let query_type = if best_score <= 0.0 || best_score == runner_up {
            QueryType::Complex
        } else {
            best
        };

        with_signals(query_type, signals)
    }
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

fn with_signals(query_type: QueryType, signals: Vec<(String, f32)>) -> QueryClassification {
    signals.into_iter().fold(
        QueryClassification::new(query_type, ClassificationSource::Heuristic),
        |classification, (name, value)| classification.with_signal(name, value),
    )
}

#[async_trait]
impl QueryClassifier for HeuristicQueryClassifier {
    async fn classify_with_signals(&self, query: &str) -> QueryClassification {
        let classification = Self::score(query);

        record_classification(classification.query_type, classification.source);
        debug!(
            query_type = %classification.query_type,
            signals = ?classification.confidence_signals,
            "Classified query heuristically"
        );

        classification
    }

    fn classifier_name(&self) -> &'static str {
        "heuristic"
    }
}
