//! Text generation request

use serde::{Deserialize, Serialize};

/// A single-prompt completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system: None,
            max_tokens: None,
            temperature: None,
            stop: Vec::new(),
        }
    }

    pub fn builder(prompt: impl Into<String>) -> GenerationRequestBuilder {
        GenerationRequestBuilder {
            request: Self::new(prompt),
        }
    }
}

/// Builder for [`GenerationRequest`]
#[derive(Debug, Clone)]
pub struct GenerationRequestBuilder {
    request: GenerationRequest,
}

impl GenerationRequestBuilder {
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.request.system = Some(system.into());
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.request.max_tokens = Some(max_tokens);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.request.temperature = Some(temperature.clamp(0.0, 2.0));
        self
    }

    pub fn stop(mut self, stop: impl Into<String>) -> Self {
        self.request.stop.push(stop.into());
        self
    }

    pub fn build(self) -> GenerationRequest {
        self.request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let request = GenerationRequest::builder("Classify this")
            .system("You are a classifier")
            .max_tokens(10)
            .temperature(3.0)
            .stop("\n")
            .build();

        assert_eq!(request.prompt, "Classify this");
        assert_eq!(request.system.as_deref(), Some("You are a classifier"));
        assert_eq!(request.max_tokens, Some(10));
        assert_eq!(request.temperature, Some(2.0));
        assert_eq!(request.stop, vec!["\n".to_string()]);
    }

    #[test]
    fn test_serialization_skips_empty_fields() {
        let json = serde_json::to_value(GenerationRequest::new("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"prompt": "hi"}));
    }
}
