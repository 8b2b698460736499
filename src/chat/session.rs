//! Core chat session management.
//!
//! This module provides the [`ChatSession`] struct which owns conversation
//! state, model selection, and the callback registry, and drives one
//! streaming turn at a time against the proxy.
//!
//! A turn is linear: validate, fire `on_request`, connect, stream chunks
//! through `on_token`, persist the turn, fire `on_response`. Any classified
//! failure rolls the conversation back to its pre-turn state and fires
//! `on_error` exactly once, so a turn either fully succeeds or leaves no
//! trace.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use serde_json::{Map, Value};

use crate::chat::config::SessionConfig;
use crate::client::ProxyClient;
use crate::conversation::{Conversation, Message, Role};
use crate::error::{Error, Result};
use crate::events::{CallbackRegistry, EventKind};
use crate::model::{KnownModel, ModelSelection};
use crate::observability;
use crate::protocol::ChatRequest;
use crate::session_logger::{NullSessionLogger, SessionLogger};

/// A chat session against the proxy endpoint.
///
/// The session exclusively owns its conversation store and callback
/// registry. It is not reentrant: one turn runs at a time. To share a
/// session between a foreground caller and the continuous loop, wrap it in
/// `Arc<tokio::sync::Mutex<_>>` (see
/// [`ContinuousChat`](crate::chat::ContinuousChat)).
pub struct ChatSession {
    client: ProxyClient,
    config: SessionConfig,
    selection: Option<ModelSelection>,
    conversation: Conversation,
    callbacks: CallbackRegistry,
    logger: Arc<dyn SessionLogger>,
    turns_completed: u64,
    turns_failed: u64,
    chunks_received: u64,
    completed_turn_duration: Duration,
    last_turn_duration: Option<Duration>,
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// The selected model, if any.
    pub model: Option<KnownModel>,

    /// The number of messages currently in the conversation.
    pub conversation_len: usize,

    /// Whether conversation tracking is enabled.
    pub tracking: bool,

    /// Turns that completed successfully.
    pub turns_completed: u64,

    /// Turns that failed with a classified error.
    pub turns_failed: u64,

    /// Non-empty chunks received across all turns.
    pub chunks_received: u64,

    /// Wall-clock duration of the most recent completed turn.
    pub last_turn_duration: Option<Duration>,

    /// Mean wall-clock duration across completed turns.
    pub average_turn_duration: Option<Duration>,
}

impl ChatSession {
    /// Creates a new session from a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] when the configured base URL does
    /// not parse.
    pub fn new(config: SessionConfig) -> Result<Self> {
        Self::with_logger(config, Arc::new(NullSessionLogger))
    }

    /// Creates a new session with an explicit logger.
    ///
    /// The logger lives exactly as long as the session.
    pub fn with_logger(config: SessionConfig, logger: Arc<dyn SessionLogger>) -> Result<Self> {
        let client = ProxyClient::with_timeout(&config.base_url, config.timeout)?;
        Ok(Self {
            client,
            config,
            selection: None,
            conversation: Conversation::new(),
            callbacks: CallbackRegistry::new(),
            logger,
            turns_completed: 0,
            turns_failed: 0,
            chunks_received: 0,
            completed_turn_duration: Duration::ZERO,
            last_turn_duration: None,
        })
    }

    /// Returns every supported model, in a stable order.
    pub fn available_models() -> &'static [KnownModel] {
        KnownModel::all()
    }

    /// Selects the model used for subsequent turns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelNotFound`] when `name` is not supported; the
    /// current selection is left unchanged.
    pub fn load_model(&mut self, name: &str) -> Result<()> {
        self.selection = Some(ModelSelection::new(name)?);
        Ok(())
    }

    /// Selects a model with initial generation parameters.
    pub fn load_model_with(&mut self, name: &str, parameters: Map<String, Value>) -> Result<()> {
        self.selection = Some(ModelSelection::with_parameters(name, parameters)?);
        Ok(())
    }

    /// Returns the currently selected model, if any.
    pub fn selected_model(&self) -> Option<KnownModel> {
        self.selection.as_ref().map(ModelSelection::model)
    }

    /// Merges `parameters` into the current selection, overwriting on key
    /// collision. No-op when no model is selected.
    pub fn set_model_parameters(&mut self, parameters: Map<String, Value>) {
        if let Some(selection) = &mut self.selection {
            selection.update_parameters(parameters);
        }
    }

    /// Returns the current generation parameters, if a model is selected.
    pub fn model_parameters(&self) -> Option<&Map<String, Value>> {
        self.selection.as_ref().map(ModelSelection::parameters)
    }

    /// Sets the system prompt sent with every turn.
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.config.system_prompt = Some(prompt.into());
    }

    /// Clears the system prompt.
    pub fn clear_system_prompt(&mut self) {
        self.config.system_prompt = None;
    }

    /// Returns the current system prompt, if any.
    pub fn system_prompt(&self) -> Option<&str> {
        self.config.system_prompt.as_deref()
    }

    /// Sets the default role the assistant acts as.
    pub fn set_role(&mut self, role: impl Into<String>) {
        self.config.role = Some(role.into());
    }

    /// Clears the default role.
    pub fn clear_role(&mut self) {
        self.config.role = None;
    }

    /// Enables conversation tracking for subsequent turns.
    pub fn enable_conversation_tracking(&mut self) {
        self.config.track_conversation = true;
    }

    /// Disables conversation tracking and discards the current history.
    pub fn disable_conversation_tracking(&mut self) {
        self.config.track_conversation = false;
        self.conversation.clear();
    }

    /// Returns whether conversation tracking is enabled.
    pub fn tracking_enabled(&self) -> bool {
        self.config.track_conversation
    }

    /// Returns the conversation history, in turn order.
    pub fn history(&self) -> &[Message] {
        self.conversation.history()
    }

    /// Discards the conversation history.
    pub fn clear_conversation(&mut self) {
        self.conversation.clear();
    }

    /// Returns the callback registry for handler registration.
    pub fn callbacks_mut(&mut self) -> &mut CallbackRegistry {
        &mut self.callbacks
    }

    /// Returns the callback registry.
    pub fn callbacks(&self) -> &CallbackRegistry {
        &self.callbacks
    }

    /// Runs one chat turn with the configured role.
    ///
    /// On success the accumulated reply text is returned and, under
    /// tracking, the user/assistant pair is appended to the history. On
    /// failure nothing is appended, `on_error` has fired once, and the
    /// classified error is returned.
    pub async fn chat(&mut self, message: &str) -> Result<String> {
        let role = self.config.role.clone();
        self.chat_with_role(message, role).await
    }

    /// Runs one chat turn acting as `role`, overriding the configured role
    /// for this turn only.
    pub async fn chat_as(&mut self, message: &str, role: &str) -> Result<String> {
        self.chat_with_role(message, Some(role.to_string())).await
    }

    /// Returns a snapshot of the session statistics.
    pub fn stats(&self) -> SessionStats {
        let average_turn_duration = if self.turns_completed > 0 {
            Some(self.completed_turn_duration / self.turns_completed as u32)
        } else {
            None
        };
        SessionStats {
            model: self.selected_model(),
            conversation_len: self.conversation.len(),
            tracking: self.config.track_conversation,
            turns_completed: self.turns_completed,
            turns_failed: self.turns_failed,
            chunks_received: self.chunks_received,
            last_turn_duration: self.last_turn_duration,
            average_turn_duration,
        }
    }

    /// Polls the `on_listening` hook for the next message to send.
    pub(crate) fn poll_listen(&mut self) -> Result<Option<String>> {
        self.callbacks.fire_listening()
    }

    async fn chat_with_role(&mut self, message: &str, role: Option<String>) -> Result<String> {
        observability::TURNS.click();
        let previous_len = self.conversation.len();
        let started = Instant::now();

        match self.run_turn(message, role).await {
            Ok(text) => {
                let elapsed = started.elapsed();
                observability::TURN_DURATION.add(elapsed.as_secs_f64());
                self.turns_completed += 1;
                self.completed_turn_duration += elapsed;
                self.last_turn_duration = Some(elapsed);
                self.logger.log_turn(&text);
                Ok(text)
            }
            Err(err) => {
                observability::TURN_ERRORS.click();
                if err.is_callback() {
                    observability::CALLBACK_ERRORS.click();
                }
                self.turns_failed += 1;
                self.conversation.truncate(previous_len);
                self.logger.log_turn_error(&err);
                self.report_failure(&err);
                Err(err)
            }
        }
    }

    /// The linear turn state machine: Validating, AwaitingConnection,
    /// Streaming, Finalizing.
    async fn run_turn(&mut self, message: &str, role: Option<String>) -> Result<String> {
        if message.trim().is_empty() {
            return Err(Error::invalid_config(
                "message must not be empty",
                Some("message".to_string()),
            ));
        }
        let selection = self.selection.as_ref().ok_or_else(|| {
            Error::invalid_config(
                "no model selected; call load_model first",
                Some("model".to_string()),
            )
        })?;

        let request = ChatRequest {
            message: message.to_string(),
            conversation_history: if self.config.track_conversation {
                self.conversation.history().to_vec()
            } else {
                Vec::new()
            },
            system_prompt: self.config.system_prompt.clone(),
            role,
            model: selection.model().to_string(),
            model_parameters: selection.parameters().clone(),
        };

        self.logger.log_request(&request);
        self.callbacks.fire_request(message)?;

        observability::CLIENT_REQUESTS.click();
        let mut stream = match self.client.chat(&request).await {
            Ok(stream) => stream,
            Err(err) => {
                observability::CLIENT_REQUEST_ERRORS.click();
                return Err(err);
            }
        };

        let mut accumulated = String::new();
        while let Some(fragment) = stream.next().await {
            let fragment = fragment?;
            if fragment.is_empty() {
                continue;
            }
            observability::STREAM_CHUNKS.click();
            self.chunks_received += 1;
            self.logger.log_chunk(&fragment);
            accumulated.push_str(&fragment);
            self.callbacks.fire_token(&fragment)?;
        }

        if self.config.track_conversation {
            self.conversation.append(Role::User, message);
            self.conversation.append(Role::Assistant, accumulated.clone());
        }
        self.callbacks.fire_response(&accumulated)?;
        Ok(accumulated)
    }

    /// Fires `on_error` for a failed turn. A failure inside the handler is
    /// swallowed after a best-effort report so it cannot mask the turn's
    /// original error.
    fn report_failure(&mut self, err: &Error) {
        if let Err(hook_err) = self.callbacks.fire_error(&err.to_string()) {
            observability::ERROR_HOOK_FAILURES.click();
            self.logger.log_callback_failure(EventKind::Error, &hook_err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> ChatSession {
        ChatSession::new(SessionConfig::new()).unwrap()
    }

    #[test]
    fn new_session_has_no_model_and_empty_history() {
        let session = session();
        assert!(session.selected_model().is_none());
        assert!(session.history().is_empty());
        assert!(!session.tracking_enabled());
    }

    #[test]
    fn load_model_validates_and_keeps_previous_selection_on_failure() {
        let mut session = session();
        session.load_model("qwen:1.8b").unwrap();
        assert_eq!(session.selected_model(), Some(KnownModel::Qwen1_8b));

        let err = session.load_model("nonexistent_model").unwrap_err();
        assert!(err.is_model_not_found());
        assert_eq!(session.selected_model(), Some(KnownModel::Qwen1_8b));
    }

    #[test]
    fn set_model_parameters_without_selection_is_noop() {
        let mut session = session();
        let mut parameters = Map::new();
        parameters.insert("temperature".to_string(), Value::from(0.7));
        session.set_model_parameters(parameters);
        assert!(session.model_parameters().is_none());
    }

    #[test]
    fn set_model_parameters_merges_into_selection() {
        let mut session = session();
        session.load_model("qwen:1.8b").unwrap();

        let mut parameters = Map::new();
        parameters.insert("temperature".to_string(), Value::from(0.7));
        parameters.insert("top_p".to_string(), Value::from(0.9));
        session.set_model_parameters(parameters);

        let current = session.model_parameters().unwrap();
        assert_eq!(current["temperature"], Value::from(0.7));
        assert_eq!(current["top_p"], Value::from(0.9));
    }

    #[test]
    fn system_prompt_round_trip() {
        let mut session = session();
        assert!(session.system_prompt().is_none());
        session.set_system_prompt("You are a helpful assistant");
        assert_eq!(session.system_prompt(), Some("You are a helpful assistant"));
        session.clear_system_prompt();
        assert!(session.system_prompt().is_none());
    }

    #[test]
    fn disable_tracking_clears_history() {
        let mut session = session();
        session.enable_conversation_tracking();
        session.conversation.append(Role::User, "hello");
        session.conversation.append(Role::Assistant, "hi");

        session.disable_conversation_tracking();
        assert!(!session.tracking_enabled());
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn empty_message_fails_before_any_network_activity() {
        // The base URL points nowhere; validation must reject the message
        // before the transport is ever touched.
        let config = SessionConfig::new().with_base_url("http://localhost:1");
        let mut session = ChatSession::new(config).unwrap();
        session.load_model("qwen:1.8b").unwrap();

        let err = session.chat("   ").await.unwrap_err();
        assert!(err.is_invalid_config());
    }

    #[tokio::test]
    async fn chat_without_model_fails() {
        let mut session = session();
        let err = session.chat("Hello").await.unwrap_err();
        assert!(err.is_invalid_config());
    }

    #[tokio::test]
    async fn failed_turn_fires_on_error_once() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let mut session = session();
        let errors = Arc::new(AtomicUsize::new(0));
        let counter = errors.clone();
        session.callbacks_mut().on_error(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let err = session.chat("Hello").await.unwrap_err();
        assert!(err.is_invalid_config());
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stats_snapshot_reflects_state() {
        let mut session = session();
        session.load_model("gemma2:2b").unwrap();
        session.enable_conversation_tracking();

        let stats = session.stats();
        assert_eq!(stats.model, Some(KnownModel::Gemma2_2b));
        assert_eq!(stats.conversation_len, 0);
        assert!(stats.tracking);
        assert_eq!(stats.turns_completed, 0);
        assert!(stats.average_turn_duration.is_none());
    }
}
