//! Query transformation types and parsing

mod queries;
mod variants;

pub use queries::{dedupe, TransformedQueries};
pub use variants::{parse_variants, strip_list_marker, DEFAULT_MIN_VARIANT_LENGTH};
