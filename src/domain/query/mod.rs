//! Query text handling and query type labels

mod normalizer;
mod query_type;

pub use normalizer::{equivalent, normalize};
pub use query_type::{ClassificationSource, QueryClassification, QueryType};
