//! Document retrieval collaborator

mod orchestrator;

pub use orchestrator::{RetrievalOrchestrator, RetrievedDocument};

#[cfg(test)]
pub use orchestrator::MockRetrievalOrchestrator;
