//! Generation provider abstraction.
//!
//! The chat pipeline talks to the hosted model only through
//! [`GenerationProvider`], so failures come back as a typed
//! [`ProviderError`] instead of an opaque exception.

pub mod gemini;

pub use gemini::{GeminiClient, GeminiConfig};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Generation method a model must support to be selectable.
pub const GENERATE_CONTENT: &str = "generateContent";

/// Errors from the external generation API.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("API key not configured (set the {0} environment variable)")]
    MissingApiKey(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Your API key is active, but it does not have access to any generation models. Check your Google AI Studio account.")]
    NoModels,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    /// Text recorded as the assistant's reply when a turn fails.
    pub fn user_message(&self) -> String {
        match self {
            ProviderError::NoModels => format!("Error: {}", self),
            other => format!("System Error: {}", other),
        }
    }
}

/// A model advertised by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    /// Fully qualified name, e.g. `models/gemini-1.5-flash`.
    pub name: String,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    pub fn supports_generation(&self) -> bool {
        self.supported_generation_methods
            .iter()
            .any(|m| m == GENERATE_CONTENT)
    }
}

/// An external text-generation service.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// List the models available to the configured credentials.
    async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError>;

    /// Generate a completion for one opaque prompt.
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, ProviderError>;
}

/// Pick the model to chat with.
///
/// Only models supporting `generateContent` are considered. The first one
/// whose name contains `preferred` wins; otherwise the first available.
pub fn select_model(models: &[ModelInfo], preferred: &str) -> Result<String, ProviderError> {
    let available: Vec<&ModelInfo> = models.iter().filter(|m| m.supports_generation()).collect();

    available
        .iter()
        .find(|m| !preferred.is_empty() && m.name.contains(preferred))
        .or_else(|| available.first())
        .map(|m| m.name.clone())
        .ok_or(ProviderError::NoModels)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(name: &str, methods: &[&str]) -> ModelInfo {
        ModelInfo {
            name: name.to_string(),
            supported_generation_methods: methods.iter().map(|m| m.to_string()).collect(),
        }
    }

    #[test]
    fn test_select_preferred_model() {
        let models = vec![
            model("models/gemini-pro", &["generateContent"]),
            model("models/gemini-1.5-flash-001", &["generateContent"]),
        ];
        assert_eq!(
            select_model(&models, "1.5-flash").unwrap(),
            "models/gemini-1.5-flash-001"
        );
    }

    #[test]
    fn test_select_falls_back_to_first() {
        let models = vec![
            model("models/embedding-001", &["embedContent"]),
            model("models/gemini-pro", &["generateContent"]),
            model("models/gemini-2.0", &["generateContent"]),
        ];
        assert_eq!(
            select_model(&models, "1.5-flash").unwrap(),
            "models/gemini-pro"
        );
    }

    #[test]
    fn test_preferred_model_must_support_generation() {
        let models = vec![
            model("models/gemini-1.5-flash-embed", &["embedContent"]),
            model("models/gemini-pro", &["generateContent"]),
        ];
        assert_eq!(
            select_model(&models, "1.5-flash").unwrap(),
            "models/gemini-pro"
        );
    }

    #[test]
    fn test_select_with_no_generation_models() {
        let models = vec![model("models/embedding-001", &["embedContent"])];
        assert!(matches!(
            select_model(&models, "1.5-flash"),
            Err(ProviderError::NoModels)
        ));
        assert!(matches!(select_model(&[], ""), Err(ProviderError::NoModels)));
    }

    #[test]
    fn test_user_message() {
        assert!(ProviderError::NoModels.user_message().starts_with("Error: "));
        let timeout = ProviderError::Timeout(30).user_message();
        assert_eq!(timeout, "System Error: Request timed out after 30s");
    }
}
