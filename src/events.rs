//! Event hooks fired during a chat turn.
//!
//! The registry holds at most one handler per event kind; registering again
//! replaces the previous handler silently. Handlers report failure by
//! returning `Err`, which the session surfaces as
//! [`Error::Callback`](crate::Error::Callback) with the event kind and the
//! original failure preserved.

use std::fmt;

use crate::error::{Error, Result};

/// The failure type handlers may return.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

type TextHandler = Box<dyn FnMut(&str) -> std::result::Result<(), HandlerError> + Send>;
type ListenHandler =
    Box<dyn FnMut() -> std::result::Result<Option<String>, HandlerError> + Send>;

/// The closed set of events a session can fire.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Fired with the outgoing message before any network activity.
    Request,

    /// Fired with each non-empty chunk as it arrives.
    Token,

    /// Fired with the accumulated text after a successful turn.
    Response,

    /// Fired with the failure message after a failed turn.
    Error,

    /// Polled by the continuous loop for the next message to send.
    Listening,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Request => write!(f, "on_request"),
            EventKind::Token => write!(f, "on_token"),
            EventKind::Response => write!(f, "on_response"),
            EventKind::Error => write!(f, "on_error"),
            EventKind::Listening => write!(f, "on_listening"),
        }
    }
}

/// One optional handler slot per event kind.
#[derive(Default)]
pub struct CallbackRegistry {
    on_request: Option<TextHandler>,
    on_token: Option<TextHandler>,
    on_response: Option<TextHandler>,
    on_error: Option<TextHandler>,
    on_listening: Option<ListenHandler>,
}

impl CallbackRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the `on_request` handler, replacing any previous one.
    pub fn on_request<F>(&mut self, handler: F)
    where
        F: FnMut(&str) -> std::result::Result<(), HandlerError> + Send + 'static,
    {
        self.on_request = Some(Box::new(handler));
    }

    /// Registers the `on_token` handler, replacing any previous one.
    pub fn on_token<F>(&mut self, handler: F)
    where
        F: FnMut(&str) -> std::result::Result<(), HandlerError> + Send + 'static,
    {
        self.on_token = Some(Box::new(handler));
    }

    /// Registers the `on_response` handler, replacing any previous one.
    pub fn on_response<F>(&mut self, handler: F)
    where
        F: FnMut(&str) -> std::result::Result<(), HandlerError> + Send + 'static,
    {
        self.on_response = Some(Box::new(handler));
    }

    /// Registers the `on_error` handler, replacing any previous one.
    pub fn on_error<F>(&mut self, handler: F)
    where
        F: FnMut(&str) -> std::result::Result<(), HandlerError> + Send + 'static,
    {
        self.on_error = Some(Box::new(handler));
    }

    /// Registers the `on_listening` handler, replacing any previous one.
    pub fn on_listening<F>(&mut self, handler: F)
    where
        F: FnMut() -> std::result::Result<Option<String>, HandlerError> + Send + 'static,
    {
        self.on_listening = Some(Box::new(handler));
    }

    /// Returns true if a handler is registered for `event`.
    pub fn has(&self, event: EventKind) -> bool {
        match event {
            EventKind::Request => self.on_request.is_some(),
            EventKind::Token => self.on_token.is_some(),
            EventKind::Response => self.on_response.is_some(),
            EventKind::Error => self.on_error.is_some(),
            EventKind::Listening => self.on_listening.is_some(),
        }
    }

    pub(crate) fn fire_request(&mut self, message: &str) -> Result<()> {
        Self::fire_text(EventKind::Request, &mut self.on_request, message)
    }

    pub(crate) fn fire_token(&mut self, chunk: &str) -> Result<()> {
        Self::fire_text(EventKind::Token, &mut self.on_token, chunk)
    }

    pub(crate) fn fire_response(&mut self, text: &str) -> Result<()> {
        Self::fire_text(EventKind::Response, &mut self.on_response, text)
    }

    pub(crate) fn fire_error(&mut self, message: &str) -> Result<()> {
        Self::fire_text(EventKind::Error, &mut self.on_error, message)
    }

    pub(crate) fn fire_listening(&mut self) -> Result<Option<String>> {
        match &mut self.on_listening {
            Some(handler) => handler().map_err(|err| Error::callback(EventKind::Listening, err)),
            None => Ok(None),
        }
    }

    fn fire_text(event: EventKind, slot: &mut Option<TextHandler>, payload: &str) -> Result<()> {
        match slot {
            Some(handler) => handler(payload).map_err(|err| Error::callback(event, err)),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("on_request", &self.on_request.is_some())
            .field("on_token", &self.on_token.is_some())
            .field("on_response", &self.on_response.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_listening", &self.on_listening.is_some())
            .finish()
    }
}
