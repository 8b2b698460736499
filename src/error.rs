//! Error types for the loquax SDK.
//!
//! Every failure a chat turn can produce is classified into one of five
//! kinds so callers can match broadly or specifically. Raw transport and
//! decoding errors never escape this taxonomy; they are converted at the
//! boundary where they occur.

use std::error;
use std::fmt;
use std::sync::Arc;

use crate::events::EventKind;

/// The main error type for the loquax SDK.
#[derive(Clone, Debug)]
pub enum Error {
    /// The requested model identifier is not in the supported set.
    ModelNotFound {
        /// The identifier that failed validation.
        model: String,
    },

    /// The session is not configured for the requested operation.
    InvalidConfig {
        /// Human-readable error message.
        message: String,
        /// Parameter that failed validation.
        param: Option<String>,
    },

    /// The proxy could not be reached, or answered with an error status.
    Connection {
        /// Human-readable error message.
        message: String,
        /// HTTP status, when a connection was established but refused.
        status_code: Option<u16>,
        /// Underlying cause.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// The chunked response failed mid-stream.
    Streaming {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// A registered event handler failed.
    Callback {
        /// The event whose handler failed.
        event: EventKind,
        /// The failure the handler reported.
        source: Arc<dyn error::Error + Send + Sync>,
    },
}

impl Error {
    /// Creates a new model-not-found error.
    pub fn model_not_found(model: impl Into<String>) -> Self {
        Error::ModelNotFound {
            model: model.into(),
        }
    }

    /// Creates a new invalid-configuration error.
    pub fn invalid_config(message: impl Into<String>, param: Option<String>) -> Self {
        Error::InvalidConfig {
            message: message.into(),
            param,
        }
    }

    /// Creates a new connection error for a transport-level failure.
    pub fn connection(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Connection {
            message: message.into(),
            status_code: None,
            source: source.map(Arc::from),
        }
    }

    /// Creates a new connection error for an error status from the proxy.
    pub fn connection_status(message: impl Into<String>, status_code: u16) -> Self {
        Error::Connection {
            message: message.into(),
            status_code: Some(status_code),
            source: None,
        }
    }

    /// Creates a new streaming error.
    pub fn streaming(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Streaming {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new callback error, preserving the event name and the
    /// handler's original failure.
    pub fn callback(event: EventKind, source: Box<dyn error::Error + Send + Sync>) -> Self {
        Error::Callback {
            event,
            source: Arc::from(source),
        }
    }

    /// Returns true if this error is a model-not-found error.
    pub fn is_model_not_found(&self) -> bool {
        matches!(self, Error::ModelNotFound { .. })
    }

    /// Returns true if this error is an invalid-configuration error.
    pub fn is_invalid_config(&self) -> bool {
        matches!(self, Error::InvalidConfig { .. })
    }

    /// Returns true if this error is a connection error.
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection { .. })
    }

    /// Returns true if this error is a streaming error.
    pub fn is_streaming(&self) -> bool {
        matches!(self, Error::Streaming { .. })
    }

    /// Returns true if this error is a callback error.
    pub fn is_callback(&self) -> bool {
        matches!(self, Error::Callback { .. })
    }

    /// Returns the HTTP status associated with this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Connection { status_code, .. } => *status_code,
            _ => None,
        }
    }

    /// Returns the event whose handler failed, if this is a callback error.
    pub fn event(&self) -> Option<EventKind> {
        match self {
            Error::Callback { event, .. } => Some(*event),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ModelNotFound { model } => {
                write!(f, "Model not found: {model} is not a supported model")
            }
            Error::InvalidConfig { message, param } => {
                if let Some(param) = param {
                    write!(f, "Invalid configuration: {message} (parameter: {param})")
                } else {
                    write!(f, "Invalid configuration: {message}")
                }
            }
            Error::Connection {
                message,
                status_code,
                ..
            } => {
                if let Some(status_code) = status_code {
                    write!(f, "Connection error: {message} (status {status_code})")
                } else {
                    write!(f, "Connection error: {message}")
                }
            }
            Error::Streaming { message, .. } => {
                write!(f, "Streaming error: {message}")
            }
            Error::Callback { event, source } => {
                write!(f, "Callback error in {event}: {source}")
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Connection { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Streaming { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Callback { source, .. } => {
                Some(source.as_ref() as &(dyn error::Error + 'static))
            }
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::streaming(format!("JSON decode error: {err}"), Some(Box::new(err)))
    }
}

/// A specialized Result type for loquax operations.
pub type Result<T> = std::result::Result<T, Error>;
