//! Logging trait for chat session operations.
//!
//! This module provides the [`SessionLogger`] trait that allows users to
//! capture everything passing through a [`ChatSession`](crate::ChatSession).
//! The logger is handed to the session at construction and lives exactly as
//! long as it does; there is no ambient logging singleton.

use crate::error::Error;
use crate::events::EventKind;
use crate::protocol::ChatRequest;

/// A trait for observing chat session operations.
///
/// All methods default to no-ops so implementations only override what they
/// care about.
///
/// # Example
///
/// ```rust,ignore
/// use loquax::{ChatRequest, SessionLogger};
/// use std::io::Write;
/// use std::sync::Mutex;
///
/// struct FileLogger {
///     file: Mutex<std::fs::File>,
/// }
///
/// impl SessionLogger for FileLogger {
///     fn log_request(&self, request: &ChatRequest) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "request: {}", serde_json::to_string(request).unwrap()).unwrap();
///     }
///
///     fn log_turn(&self, response: &str) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "turn complete: {response}").unwrap();
///     }
/// }
/// ```
pub trait SessionLogger: Send + Sync {
    /// Log the outgoing request for a turn, before any network activity.
    fn log_request(&self, request: &ChatRequest) {
        let _ = request;
    }

    /// Log one received chunk.
    ///
    /// Called once per non-empty fragment during streaming, in arrival
    /// order.
    fn log_chunk(&self, chunk: &str) {
        let _ = chunk;
    }

    /// Log the accumulated text of a successfully completed turn.
    fn log_turn(&self, response: &str) {
        let _ = response;
    }

    /// Log the classified failure of a turn.
    fn log_turn_error(&self, error: &Error) {
        let _ = error;
    }

    /// Best-effort report of a handler that failed inside `on_error`.
    ///
    /// Such failures are swallowed so they cannot mask the turn's original
    /// error; this hook is the only place they surface.
    fn log_callback_failure(&self, event: EventKind, error: &Error) {
        let _ = (event, error);
    }
}

/// A logger that records nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSessionLogger;

impl SessionLogger for NullSessionLogger {}
