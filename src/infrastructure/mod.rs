//! Infrastructure layer - External service implementations

pub mod cache;
pub mod classification;
pub mod conversation;
pub mod embedding;
pub mod llm;
pub mod logging;
pub mod observability;
pub mod services;
pub mod store;
pub mod timeout;
pub mod transformation;
