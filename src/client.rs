//! HTTP transport between the chat session and the proxy.
//!
//! The client issues the streaming chat POST and classifies every transport
//! failure into the crate's error taxonomy: failures establishing the
//! connection (and error statuses) become `Connection`, failures after the
//! stream has started become `Streaming`.

use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures::Stream;
use futures::stream::{self, StreamExt};
use reqwest::{Client as ReqwestClient, Response, header};
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::{ChatRequest, ChatResponse};

/// Default request/stream timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// A stream of opaque text fragments from the proxy.
///
/// Fragment boundaries carry no meaning; the concatenation of all fragments
/// in arrival order is the full reply.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Client for the chat proxy endpoint.
#[derive(Debug, Clone)]
pub struct ProxyClient {
    client: ReqwestClient,
    base_url: String,
    timeout: Duration,
}

impl ProxyClient {
    /// Creates a new client for the proxy at `base_url` with the default
    /// timeout.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Creates a new client with a custom request/stream timeout.
    ///
    /// The timeout bounds the whole exchange, connection establishment and
    /// stream read included; an unbounded stream read is a resource risk.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        Url::parse(base_url).map_err(|err| {
            Error::invalid_config(
                format!("invalid proxy base URL {base_url:?}: {err}"),
                Some("base_url".to_string()),
            )
        })?;
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| {
                Error::connection(
                    format!("failed to build HTTP client: {err}"),
                    Some(Box::new(err)),
                )
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Returns the configured proxy base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the configured request/stream timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Posts a chat request and returns the reply as a chunk stream.
    ///
    /// Both proxy reply shapes are supported: a chunked token stream is
    /// passed through fragment by fragment, and a single
    /// `{"response": ...}` JSON body becomes a one-fragment stream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] when the proxy cannot be reached or
    /// answers with an error status (the status is carried), and
    /// [`Error::Streaming`] for failures after the stream has started.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChunkStream> {
        let url = format!("{}/chat", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|err| {
                Error::connection(format!("failed to reach proxy: {err}"), Some(Box::new(err)))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = if body.is_empty() {
                format!("proxy returned {status}")
            } else {
                format!("proxy returned {status}: {body}")
            };
            return Err(Error::connection_status(detail, status.as_u16()));
        }

        if is_json(&response) {
            let body: ChatResponse = response.json().await.map_err(|err| {
                Error::streaming(
                    format!("failed to decode JSON response: {err}"),
                    Some(Box::new(err)),
                )
            })?;
            return Ok(Box::pin(stream::once(async move {
                Ok::<String, Error>(body.response)
            })));
        }

        Ok(chunk_stream(response.bytes_stream()))
    }
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("application/json"))
        .unwrap_or(false)
}

/// Turns a byte stream into a stream of UTF-8 text fragments.
///
/// Transport chunk boundaries are not guaranteed to align with character
/// boundaries, so an incomplete trailing sequence is carried over into the
/// next chunk. Empty fragments are dropped.
fn chunk_stream<S>(byte_stream: S) -> ChunkStream
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Send + Unpin + 'static,
{
    let stream = byte_stream.map(|result| {
        result.map_err(|err| {
            Error::streaming(
                format!("error reading chunked response: {err}"),
                Some(Box::new(err)),
            )
        })
    });

    Box::pin(stream::unfold(
        (stream, Vec::new(), false),
        |(mut stream, mut carry, finished)| async move {
            if finished {
                return None;
            }
            loop {
                match stream.next().await {
                    Some(Ok(bytes)) => {
                        carry.extend_from_slice(&bytes);
                        match take_utf8_prefix(&mut carry) {
                            Ok(Some(text)) => return Some((Ok(text), (stream, carry, false))),
                            Ok(None) => continue,
                            Err(err) => return Some((Err(err), (stream, carry, true))),
                        }
                    }
                    Some(Err(err)) => return Some((Err(err), (stream, carry, true))),
                    None => {
                        if carry.is_empty() {
                            return None;
                        }
                        let err = Error::streaming(
                            "response stream ended inside a UTF-8 sequence",
                            None,
                        );
                        return Some((Err(err), (stream, carry, true)));
                    }
                }
            }
        },
    ))
}

/// Takes the longest valid UTF-8 prefix out of `carry`.
///
/// Returns `Ok(None)` when the buffer holds nothing but an incomplete
/// trailing sequence, and an error when the bytes can never become valid
/// UTF-8.
fn take_utf8_prefix(carry: &mut Vec<u8>) -> Result<Option<String>> {
    match std::str::from_utf8(carry) {
        Ok(text) => {
            if text.is_empty() {
                return Ok(None);
            }
            let text = text.to_string();
            carry.clear();
            Ok(Some(text))
        }
        Err(err) => {
            if err.error_len().is_some() {
                return Err(Error::streaming(
                    format!("invalid UTF-8 in response stream: {err}"),
                    Some(Box::new(err)),
                ));
            }
            let valid = err.valid_up_to();
            if valid == 0 {
                return Ok(None);
            }
            let text = String::from_utf8_lossy(&carry[..valid]).into_owned();
            carry.drain(..valid);
            Ok(Some(text))
        }
    }
}
