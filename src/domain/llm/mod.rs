//! LLM provider domain models and traits

mod provider;
mod request;

pub use provider::{LlmProvider, TextStream};
pub use request::{GenerationRequest, GenerationRequestBuilder};

#[cfg(test)]
pub use provider::mock::MockLlmProvider;
