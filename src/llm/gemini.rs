//! Google Gemini REST client.
//!
//! Implements [`GenerationProvider`] against the `generativelanguage`
//! v1beta API: `GET /v1beta/models` and
//! `POST /v1beta/{model}:generateContent`.

use super::{GenerationProvider, ModelInfo, ProviderError};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Upper bound on `models.list` pages fetched for one listing.
const MAX_MODEL_PAGES: usize = 20;

/// Connection settings for the Gemini API.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub base_url: String,
    /// Environment variable holding the API key. Read on every call.
    pub api_key_env: String,
    pub timeout_seconds: u64,
    pub temperature: Option<f32>,
}

#[cfg(test)]
impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_seconds: 120,
            temperature: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

/// Client for the Gemini API.
pub struct GeminiClient {
    config: GeminiConfig,
    http_client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, ProviderError> {
        info!(
            "Initializing Gemini client for {} (timeout {}s)",
            config.base_url, config.timeout_seconds
        );

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ProviderError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Read the API key from the environment at call time.
    fn api_key(&self) -> Result<SecretString, ProviderError> {
        std::env::var(&self.config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::from)
            .ok_or_else(|| ProviderError::MissingApiKey(self.config.api_key_env.clone()))
    }

    fn models_url(&self) -> String {
        format!("{}/v1beta/models", self.config.base_url.trim_end_matches('/'))
    }

    fn generate_url(&self, model: &str) -> String {
        format!(
            "{}/v1beta/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            qualified_model_name(model)
        )
    }

    fn map_send_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(self.config.timeout_seconds)
        } else if e.is_connect() {
            ProviderError::Network(format!("Cannot connect to {}", self.config.base_url))
        } else {
            ProviderError::Network(format!("Failed to send request: {}", e))
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status.as_u16(), body))
    }
}

#[async_trait]
impl GenerationProvider for GeminiClient {
    async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
        let key = self.api_key()?;
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages_fetched = 0;

        loop {
            let mut request = self
                .http_client
                .get(self.models_url())
                .header("x-goog-api-key", key.expose_secret())
                .query(&[("pageSize", "1000")]);
            if let Some(ref token) = page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request.send().await.map_err(|e| self.map_send_error(e))?;
            let response = Self::check_status(response).await?;
            let page: ListModelsResponse = response
                .json()
                .await
                .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

            models.extend(page.models);
            pages_fetched += 1;

            match next_page_token(page_token.as_deref(), page.next_page_token, pages_fetched) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!("Provider lists {} models", models.len());
        Ok(models)
    }

    async fn generate(&self, model: &str, prompt: &str) -> Result<String, ProviderError> {
        let key = self.api_key()?;

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: self
                .config
                .temperature
                .map(|temperature| GenerationConfig { temperature }),
        };

        debug!("Sending generateContent to {} ({} chars)", model, prompt.len());

        let response = self
            .http_client
            .post(self.generate_url(model))
            .header("x-goog-api-key", key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let response = Self::check_status(response).await?;
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(format!("Failed to read response: {}", e)))?;

        extract_text(&body)
    }
}

/// Model names from the list call are already `models/...`; bare names
/// from configuration are qualified here.
fn qualified_model_name(model: &str) -> String {
    if model.starts_with("models/") || model.starts_with("tunedModels/") {
        model.to_string()
    } else {
        format!("models/{}", model)
    }
}

fn classify_status(status: u16, body: String) -> ProviderError {
    match status {
        401 | 403 => ProviderError::Authentication(body),
        // Gemini answers an invalid key with 400 INVALID_ARGUMENT.
        400 if body.contains("API_KEY_INVALID") || body.contains("API key not valid") => {
            ProviderError::Authentication(body)
        }
        _ => ProviderError::Api { status, body },
    }
}

/// Pull the reply text out of a generateContent response body.
fn extract_text(body: &str) -> Result<String, ProviderError> {
    let parsed: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::MalformedResponse(format!("invalid JSON: {}", e)))?;

    let text: String = parsed
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if !text.is_empty() {
        return Ok(text);
    }

    let reason = parsed
        .prompt_feedback
        .and_then(|f| f.block_reason)
        .map(|r| format!("prompt blocked ({})", r))
        .unwrap_or_else(|| "response contained no text".to_string());
    Err(ProviderError::MalformedResponse(reason))
}

/// Token for the next `models.list` page, or `None` to stop paging.
///
/// Stops on an empty token, a token equal to the one just used, or once
/// [`MAX_MODEL_PAGES`] pages have been fetched.
fn next_page_token(
    previous: Option<&str>,
    next: Option<String>,
    pages_fetched: usize,
) -> Option<String> {
    let token = next.filter(|t| !t.is_empty())?;

    if previous == Some(token.as_str()) {
        warn!("Model listing repeated page token '{}'; stopping", token);
        return None;
    }
    if pages_fetched >= MAX_MODEL_PAGES {
        warn!("Model listing exceeded {} pages; stopping", MAX_MODEL_PAGES);
        return None;
    }

    Some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_joins_parts() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"there"}],"role":"model"}}]}"#;
        assert_eq!(extract_text(body).unwrap(), "Hello there");
    }

    #[test]
    fn test_extract_text_blocked_prompt() {
        let body = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        match extract_text(body) {
            Err(ProviderError::MalformedResponse(msg)) => assert!(msg.contains("SAFETY")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_extract_text_invalid_json() {
        assert!(matches!(
            extract_text("<html>502</html>"),
            Err(ProviderError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_list_models_response_parsing() {
        let body = r#"{"models":[{"name":"models/gemini-1.5-flash","supportedGenerationMethods":["generateContent","countTokens"]}],"nextPageToken":"abc"}"#;
        let page: ListModelsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(page.models.len(), 1);
        assert!(page.models[0].supports_generation());
        assert_eq!(page.next_page_token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_next_page_token_guards() {
        assert_eq!(
            next_page_token(None, Some("p2".to_string()), 1),
            Some("p2".to_string())
        );
        assert_eq!(next_page_token(Some("p2"), Some("p3".to_string()), 2).as_deref(), Some("p3"));

        assert_eq!(next_page_token(None, None, 1), None);
        assert_eq!(next_page_token(None, Some(String::new()), 1), None);
        assert_eq!(next_page_token(Some("p2"), Some("p2".to_string()), 2), None);
        assert_eq!(
            next_page_token(Some("p19"), Some("p20".to_string()), MAX_MODEL_PAGES),
            None
        );
    }

    #[test]
    fn test_request_serialization() {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: "hi" }],
            }],
            generation_config: Some(GenerationConfig { temperature: 0.5 }),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(json["generationConfig"]["temperature"], 0.5);
    }

    #[test]
    fn test_qualified_model_name() {
        assert_eq!(qualified_model_name("gemini-pro"), "models/gemini-pro");
        assert_eq!(
            qualified_model_name("models/gemini-1.5-flash"),
            "models/gemini-1.5-flash"
        );
    }

    #[test]
    fn test_generate_url() {
        let client = GeminiClient::new(GeminiConfig {
            base_url: "https://example.test/".to_string(),
            ..GeminiConfig::default()
        })
        .unwrap();
        assert_eq!(
            client.generate_url("models/gemini-1.5-flash"),
            "https://example.test/v1beta/models/gemini-1.5-flash:generateContent"
        );
        assert_eq!(client.models_url(), "https://example.test/v1beta/models");
    }

    #[test]
    fn test_classify_status() {
        assert!(matches!(
            classify_status(403, "forbidden".into()),
            ProviderError::Authentication(_)
        ));
        assert!(matches!(
            classify_status(400, "API key not valid. Please pass a valid API key.".into()),
            ProviderError::Authentication(_)
        ));
        assert!(matches!(
            classify_status(500, "boom".into()),
            ProviderError::Api { status: 500, .. }
        ));
    }

    #[test]
    fn test_missing_key_fails_at_call_time() {
        let client = GeminiClient::new(GeminiConfig {
            api_key_env: "COHORT_ASSISTANT_TEST_KEY_NEVER_SET".to_string(),
            ..GeminiConfig::default()
        })
        .unwrap();

        let result = tokio_test::block_on(client.list_models());
        match result {
            Err(ProviderError::MissingApiKey(var)) => {
                assert_eq!(var, "COHORT_ASSISTANT_TEST_KEY_NEVER_SET")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
