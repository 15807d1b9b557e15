//! Domain layer - Core types, traits and pure logic

pub mod adaptive;
pub mod cache;
pub mod classification;
pub mod clock;
pub mod confidence;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod query;
pub mod retrieval;
pub mod store;
pub mod transformation;

pub use adaptive::{AdaptiveFeatureProfile, AdaptiveFeatureSelector, FeatureProfileTable};
pub use cache::{
    CacheEntry, CacheLookup, CacheStats, CacheTier, MissReason, QueryCacheConfig,
};
pub use classification::QueryClassifier;
pub use clock::{Clock, ManualClock, SystemClock};
pub use confidence::{ConfidenceLevel, ConfidenceScore, ConfidenceScorer, ConfidenceSignals};
pub use embedding::{cosine_similarity, EmbeddingProvider};
pub use error::DomainError;
pub use llm::{GenerationRequest, GenerationRequestBuilder, LlmProvider, TextStream};
pub use query::{normalize, ClassificationSource, QueryClassification, QueryType};
pub use retrieval::{RetrievalOrchestrator, RetrievedDocument};
pub use store::{KeyValueStore, KeyValueStoreExt};
pub use transformation::TransformedQueries;
