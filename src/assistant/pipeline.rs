//! Chat response pipeline.
//!
//! Each turn records the user's message, sends the system prompt plus the
//! serialized conversation to the provider, and records the reply. Every
//! provider failure is contained: it becomes exactly one assistant message
//! and a [`Reply::Failure`] for the caller, never an `Err`.
//!
//! The generation model is listed and selected on the first turn and cached
//! afterwards. A failed turn clears the cache so the next turn lists again.

use crate::assistant::conversation::{serialize_messages, ConversationState};
use crate::llm::{select_model, GenerationProvider, ProviderError};
use crate::models::Reply;
use tracing::{debug, info, warn};

/// Where the pipeline is in a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    AwaitingUserInput,
    RequestInFlight,
}

/// Configuration for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Substring identifying the preferred model, e.g. `1.5-flash`.
    pub preferred_model: String,
    /// Messages sent per request, most recent first kept; 0 sends all.
    pub max_history_messages: usize,
}

#[cfg(test)]
impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            preferred_model: "1.5-flash".to_string(),
            max_history_messages: 40,
        }
    }
}

/// Drives one chat session against a generation provider.
pub struct ResponsePipeline<P: GenerationProvider> {
    provider: P,
    config: PipelineConfig,
    system_prompt: String,
    conversation: ConversationState,
    state: PipelineState,
    cached_model: Option<String>,
}

impl<P: GenerationProvider> ResponsePipeline<P> {
    pub fn new(
        provider: P,
        config: PipelineConfig,
        system_prompt: String,
        greeting: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            config,
            system_prompt,
            conversation: ConversationState::new(greeting),
            state: PipelineState::Idle,
            cached_model: None,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    /// The model chosen on a previous successful turn, if any.
    #[cfg(test)]
    pub fn cached_model(&self) -> Option<&str> {
        self.cached_model.as_deref()
    }

    /// Mark the pipeline as waiting for the user to type.
    pub fn await_input(&mut self) {
        if self.state == PipelineState::Idle {
            self.state = PipelineState::AwaitingUserInput;
        }
    }

    /// Run one chat turn for `text`.
    pub async fn submit(&mut self, text: &str) -> Reply {
        // Recorded before any network call so a failed turn keeps it.
        self.conversation.push_user(text);
        self.state = PipelineState::RequestInFlight;

        let reply = match self.request_reply().await {
            Ok(answer) => {
                self.conversation.push_assistant(answer.clone());
                Reply::Success(answer)
            }
            Err(e) => {
                warn!("Chat turn failed: {}", e);
                self.cached_model = None;
                self.conversation.push_assistant(e.user_message());
                Reply::Failure(e)
            }
        };

        self.state = PipelineState::Idle;
        reply
    }

    /// The full prompt for the current conversation.
    pub fn build_prompt(&self) -> String {
        let history = self.conversation.recent(self.config.max_history_messages);

        let mut prompt = String::new();
        prompt.push_str("SYSTEM KNOWLEDGE & INSTRUCTIONS:\n");
        prompt.push_str(&self.system_prompt);
        prompt.push_str("\n\n--- CURRENT CONVERSATION ---\n");
        prompt.push_str(&serialize_messages(history));
        prompt
    }

    async fn request_reply(&mut self) -> Result<String, ProviderError> {
        let model = self.resolve_model().await?;
        let prompt = self.build_prompt();

        debug!(
            "Requesting reply from {} with {} of {} messages",
            model,
            self.conversation
                .recent(self.config.max_history_messages)
                .len(),
            self.conversation.len()
        );

        self.provider.generate(&model, &prompt).await
    }

    async fn resolve_model(&mut self) -> Result<String, ProviderError> {
        if let Some(ref model) = self.cached_model {
            return Ok(model.clone());
        }

        let models = self.provider.list_models().await?;
        let selected = select_model(&models, &self.config.preferred_model)?;
        info!("Using generation model {}", selected);

        self.cached_model = Some(selected.clone());
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ModelInfo;
    use crate::models::Role;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Provider returning scripted results and recording what it was sent.
    #[derive(Default)]
    struct ScriptedProvider {
        models: Vec<ModelInfo>,
        list_failure: Mutex<Option<ProviderError>>,
        replies: Mutex<VecDeque<Result<String, ProviderError>>>,
        prompts: Arc<Mutex<Vec<(String, String)>>>,
        list_calls: Arc<AtomicUsize>,
    }

    impl ScriptedProvider {
        fn with_models(names: &[&str]) -> Self {
            Self {
                models: names
                    .iter()
                    .map(|n| ModelInfo {
                        name: n.to_string(),
                        supported_generation_methods: vec!["generateContent".to_string()],
                    })
                    .collect(),
                ..Default::default()
            }
        }

        fn reply(self, result: Result<String, ProviderError>) -> Self {
            self.replies.lock().unwrap().push_back(result);
            self
        }
    }

    #[async_trait]
    impl GenerationProvider for ScriptedProvider {
        async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(e) = self.list_failure.lock().unwrap().take() {
                return Err(e);
            }
            Ok(self.models.clone())
        }

        async fn generate(&self, model: &str, prompt: &str) -> Result<String, ProviderError> {
            self.prompts
                .lock()
                .unwrap()
                .push((model.to_string(), prompt.to_string()));
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ProviderError::MalformedResponse("no script".into())))
        }
    }

    fn pipeline(provider: ScriptedProvider) -> ResponsePipeline<ScriptedProvider> {
        ResponsePipeline::new(
            provider,
            PipelineConfig::default(),
            "SYSTEM".to_string(),
            "Hello!",
        )
    }

    #[test]
    fn test_successful_turn() {
        let provider = ScriptedProvider::with_models(&["models/gemini-1.5-flash"])
            .reply(Ok("Cohort 2020-08 leads.".to_string()));
        let prompts = provider.prompts.clone();
        let mut p = pipeline(provider);

        let reply = tokio_test::block_on(p.submit("Which cohort is best?"));

        assert!(matches!(reply, Reply::Success(ref t) if t == "Cohort 2020-08 leads."));
        assert_eq!(p.state(), PipelineState::Idle);

        let messages = p.conversation().messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].content, "Hello!");
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[2].content, "Cohort 2020-08 leads.");

        let sent = prompts.lock().unwrap();
        assert_eq!(sent[0].0, "models/gemini-1.5-flash");
        assert!(sent[0].1.starts_with("SYSTEM KNOWLEDGE & INSTRUCTIONS:\nSYSTEM\n\n--- CURRENT CONVERSATION ---\n"));
        assert!(sent[0].1.ends_with("assistant: Hello!\nuser: Which cohort is best?"));
    }

    #[test]
    fn test_failure_records_user_message_and_one_error() {
        let provider = ScriptedProvider::with_models(&["models/gemini-pro"]).reply(Err(
            ProviderError::Authentication("API key not valid".to_string()),
        ));
        let mut p = pipeline(provider);

        let reply = tokio_test::block_on(p.submit("Total outstanding?"));

        assert!(matches!(
            reply,
            Reply::Failure(ProviderError::Authentication(_))
        ));
        let messages = p.conversation().messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].content, "Total outstanding?");
        assert_eq!(messages[2].role, Role::Assistant);
        assert!(messages[2].content.starts_with("System Error: Authentication failed"));
        let assistant_messages = messages.iter().filter(|m| m.role == Role::Assistant).count();
        assert_eq!(assistant_messages, 2);
        assert_eq!(p.state(), PipelineState::Idle);
    }

    #[test]
    fn test_missing_key_is_contained() {
        let provider = ScriptedProvider::with_models(&[]);
        *provider.list_failure.lock().unwrap() =
            Some(ProviderError::MissingApiKey("GEMINI_API_KEY".to_string()));
        let mut p = pipeline(provider);

        let reply = tokio_test::block_on(p.submit("hi"));

        assert!(matches!(reply, Reply::Failure(ProviderError::MissingApiKey(_))));
        assert_eq!(p.conversation().len(), 3);
    }

    #[test]
    fn test_no_models_message() {
        let mut p = pipeline(ScriptedProvider::with_models(&[]));

        let reply = tokio_test::block_on(p.submit("hi"));

        assert!(matches!(reply, Reply::Failure(ProviderError::NoModels)));
        let last = p.conversation().last().unwrap();
        assert!(last.content.starts_with("Error: Your API key is active"));
    }

    #[test]
    fn test_model_listed_once_then_relisted_after_failure() {
        let provider = ScriptedProvider::with_models(&["models/gemini-1.5-flash"])
            .reply(Ok("one".to_string()))
            .reply(Ok("two".to_string()))
            .reply(Err(ProviderError::Network("reset".to_string())))
            .reply(Ok("four".to_string()));
        let list_calls = provider.list_calls.clone();
        let mut p = pipeline(provider);

        tokio_test::block_on(p.submit("1"));
        tokio_test::block_on(p.submit("2"));
        assert_eq!(list_calls.load(Ordering::SeqCst), 1);
        assert_eq!(p.cached_model(), Some("models/gemini-1.5-flash"));

        tokio_test::block_on(p.submit("3"));
        assert_eq!(p.cached_model(), None);

        let reply = tokio_test::block_on(p.submit("4"));
        assert!(reply.is_success());
        assert_eq!(list_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_history_window_limits_prompt_not_log() {
        let provider = ScriptedProvider::with_models(&["models/gemini-pro"])
            .reply(Ok("a1".to_string()))
            .reply(Ok("a2".to_string()));
        let prompts = provider.prompts.clone();
        let mut p = ResponsePipeline::new(
            provider,
            PipelineConfig {
                preferred_model: String::new(),
                max_history_messages: 2,
            },
            "SYSTEM".to_string(),
            "Hello!",
        );

        tokio_test::block_on(p.submit("q1"));
        tokio_test::block_on(p.submit("q2"));

        assert_eq!(p.conversation().len(), 5);
        let sent = prompts.lock().unwrap();
        let last_prompt = &sent[1].1;
        assert!(last_prompt.ends_with("--- CURRENT CONVERSATION ---\nassistant: a1\nuser: q2"));
        assert!(!last_prompt.contains("Hello!"));
    }

    #[test]
    fn test_await_input_transition() {
        let mut p = pipeline(ScriptedProvider::with_models(&[]));
        assert_eq!(p.state(), PipelineState::Idle);
        p.await_input();
        assert_eq!(p.state(), PipelineState::AwaitingUserInput);
    }
}
