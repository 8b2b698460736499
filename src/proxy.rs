//! The proxy endpoint between chat clients and the inference backend.
//!
//! `POST /chat` receives a structured [`ChatRequest`], validates the model
//! against the supported set, reconstructs the full prompt, forwards a
//! streaming generation request to the backend, and re-emits each backend
//! record's `response` field as one raw text chunk until the record marked
//! `done`.
//!
//! Status mapping: 200 normal stream, 422 unsupported model, 503 backend
//! unreachable, 500 any other backend failure. A backend failure after
//! streaming began terminates the response body abnormally instead, so the
//! client classifies it as a streaming failure.

use std::io;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::{Json, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use bytes::Bytes;
use futures::Stream;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use url::Url;

use crate::error::{Error, Result};
use crate::model::KnownModel;
use crate::observability;
use crate::protocol::{ChatRequest, GenerateRecord, GenerateRequest};

/// Default backend generation endpoint.
const DEFAULT_BACKEND_URL: &str = "http://localhost:11434";

/// Default bound on backend connection establishment.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for the proxy endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyConfig {
    /// Base URL of the inference backend.
    pub backend_url: String,

    /// Bound on backend connection establishment. Generation streams are
    /// not bounded; a model can legitimately take minutes.
    pub connect_timeout: Duration,
}

impl ProxyConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Sets the backend base URL.
    pub fn with_backend_url(mut self, backend_url: impl Into<String>) -> Self {
        self.backend_url = backend_url.into();
        self
    }

    /// Sets the backend connect timeout.
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
struct ProxyState {
    client: reqwest::Client,
    config: ProxyConfig,
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

/// Builds the proxy router.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] when the backend URL does not parse,
/// and [`Error::Connection`] when the backend HTTP client cannot be built.
pub fn router(config: ProxyConfig) -> Result<Router> {
    Url::parse(&config.backend_url).map_err(|err| {
        Error::invalid_config(
            format!("invalid backend URL {:?}: {err}", config.backend_url),
            Some("backend_url".to_string()),
        )
    })?;
    let client = reqwest::Client::builder()
        .connect_timeout(config.connect_timeout)
        .build()
        .map_err(|err| {
            Error::connection(
                format!("failed to build backend HTTP client: {err}"),
                Some(Box::new(err)),
            )
        })?;
    let state = ProxyState { client, config };
    Ok(Router::new().route("/chat", post(chat_handler)).with_state(state))
}

async fn chat_handler(
    State(state): State<ProxyState>,
    Json(request): Json<ChatRequest>,
) -> Response {
    observability::PROXY_REQUESTS.click();

    let model: KnownModel = match request.model.parse() {
        Ok(model) => model,
        Err(_) => {
            observability::PROXY_REJECTED_MODELS.click();
            tracing::warn!(model = %request.model, "rejecting unsupported model");
            return error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("unsupported model: {}", request.model),
            );
        }
    };

    let generate = GenerateRequest {
        model: model.to_string(),
        prompt: build_prompt(&request),
        parameters: request.model_parameters.clone(),
        stream: true,
    };

    let url = format!(
        "{}/api/generate",
        state.config.backend_url.trim_end_matches('/')
    );
    tracing::debug!(model = %model, history_len = request.conversation_history.len(), "forwarding generation request");

    let response = match state.client.post(&url).json(&generate).send().await {
        Ok(response) => response,
        Err(err) if err.is_connect() || err.is_timeout() => {
            observability::PROXY_BACKEND_ERRORS.click();
            tracing::error!(error = %err, "backend unreachable");
            return error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "inference backend unreachable".to_string(),
            );
        }
        Err(err) => {
            observability::PROXY_BACKEND_ERRORS.click();
            tracing::error!(error = %err, "backend request failed");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("backend request failed: {err}"),
            );
        }
    };

    let status = response.status();
    if !status.is_success() {
        observability::PROXY_BACKEND_ERRORS.click();
        tracing::error!(status = %status, "backend returned error status");
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("backend returned {status}"),
        );
    }

    let body = Body::from_stream(record_stream(response.bytes_stream()));
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}

fn error_response(status: StatusCode, detail: String) -> Response {
    (status, Json(ErrorBody { detail })).into_response()
}

/// Builds the single prompt string forwarded to the backend.
///
/// Concatenation order is fixed: system-prompt block, role-assignment
/// block, each history entry as `"{role}: {content}\n"` in stored order,
/// then the current user message.
pub fn build_prompt(request: &ChatRequest) -> String {
    let mut prompt = String::new();
    if let Some(system_prompt) = &request.system_prompt {
        prompt.push_str(&format!("System: {system_prompt}\n\n"));
    }
    if let Some(role) = &request.role {
        prompt.push_str(&format!("You are acting as: {role}\n\n"));
    }
    for message in &request.conversation_history {
        prompt.push_str(&format!("{}: {}\n", message.role, message.content));
    }
    prompt.push_str(&format!("\nUser: {}\n", request.message));
    prompt
}

/// Reduces the backend's newline-delimited records to raw text chunks.
///
/// Each record's `response` field becomes one outgoing chunk; forwarding
/// stops at the record marked `done` or at stream end. Lines are buffered
/// across transport chunk boundaries.
fn record_stream<S>(
    byte_stream: S,
) -> impl Stream<Item = std::result::Result<Bytes, io::Error>> + Send + 'static
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Send + Unpin + 'static,
{
    stream::unfold(
        (byte_stream, Vec::new(), false),
        |(mut stream, mut buffer, finished)| async move {
            if finished {
                return None;
            }
            loop {
                while let Some(line) = next_line(&mut buffer) {
                    if line.iter().all(|byte| byte.is_ascii_whitespace()) {
                        continue;
                    }
                    match parse_record(&line) {
                        Ok(record) => {
                            let done = record.done;
                            if let Some(fragment) =
                                record.response.filter(|fragment| !fragment.is_empty())
                            {
                                observability::PROXY_CHUNKS.click();
                                return Some((Ok(Bytes::from(fragment)), (stream, buffer, done)));
                            }
                            if done {
                                return None;
                            }
                        }
                        Err(err) => {
                            tracing::error!(error = %err, "invalid backend record");
                            return Some((Err(err), (stream, buffer, true)));
                        }
                    }
                }
                match stream.next().await {
                    Some(Ok(bytes)) => buffer.extend_from_slice(&bytes),
                    Some(Err(err)) => {
                        tracing::error!(error = %err, "backend stream failed");
                        return Some((Err(io::Error::other(err)), (stream, buffer, true)));
                    }
                    None => {
                        if buffer.iter().all(|byte| byte.is_ascii_whitespace()) {
                            return None;
                        }
                        let line = std::mem::take(&mut buffer);
                        match parse_record(&line) {
                            Ok(record) => {
                                let fragment = record
                                    .response
                                    .filter(|fragment| !fragment.is_empty())?;
                                observability::PROXY_CHUNKS.click();
                                return Some((Ok(Bytes::from(fragment)), (stream, buffer, true)));
                            }
                            Err(err) => {
                                return Some((Err(err), (stream, buffer, true)));
                            }
                        }
                    }
                }
            }
        },
    )
}

fn parse_record(line: &[u8]) -> std::result::Result<GenerateRecord, io::Error> {
    serde_json::from_slice(line).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
}

/// Takes the next complete line out of `buffer`, stripping the line ending.
fn next_line(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let pos = buffer.iter().position(|&byte| byte == b'\n')?;
    let mut line: Vec<u8> = buffer.drain(..=pos).collect();
    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Some(line)
}
