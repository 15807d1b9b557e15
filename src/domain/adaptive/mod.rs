//! Adaptive retrieval feature selection

mod profile;
mod selector;

pub use profile::AdaptiveFeatureProfile;
pub use selector::{AdaptiveFeatureSelector, FeatureProfileTable};
