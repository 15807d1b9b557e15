//! Infrastructure services

mod query_service;

pub use query_service::{QueryService, QueryServiceConfig, QueryServiceDeps, RagAnswer};
