//! # HTTP Client
//!
//! JSON over HTTP against a fixed base URL. The token store is read fresh
//! before every request: a stored token goes out as `Authorization: Token
//! <key>`, otherwise the request is sent anonymously. Nothing here retries.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Method;
use reqwest::header::AUTHORIZATION;
use serde_json::Value;

use crate::core::token_store::TokenStore;

/// Errors surfaced by the transport. Cloneable so a single in-flight
/// response can be handed to every subscriber waiting on it.
#[derive(Debug, Clone, PartialEq)]
pub enum HttpError {
    /// No response was received (DNS, refused connection, timeout).
    Network { message: String },
    /// The server answered with a non-2xx status. `data` is the decoded
    /// body, or the raw text when the body is not JSON.
    Status {
        status: u16,
        data: Value,
        message: String,
    },
    /// A successful response whose body could not be decoded as JSON.
    Parse { status: u16, message: String },
}

impl HttpError {
    /// The HTTP status, if a response was received at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::Network { .. } => None,
            HttpError::Status { status, .. } | HttpError::Parse { status, .. } => Some(*status),
        }
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpError::Network { message } => write!(f, "network error: {message}"),
            HttpError::Status {
                status, message, ..
            } => write!(f, "HTTP {status}: {message}"),
            HttpError::Parse { status, message } => {
                write!(f, "could not decode response (HTTP {status}): {message}")
            }
        }
    }
}

impl std::error::Error for HttpError {}

/// A request as an endpoint describes it, relative to the base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            body: Some(body),
        }
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::PUT,
            path: path.into(),
            body: Some(body),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::DELETE,
            path: path.into(),
            body: None,
        }
    }
}

/// The seam between the resource cache and the network.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<Value, HttpError>;
}

/// reqwest-backed transport for the book API.
pub struct HttpClient {
    base_url: String,
    client: reqwest::Client,
    tokens: Arc<dyn TokenStore>,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
            tokens,
        }
    }

    /// Builds a client whose requests fail with `HttpError::Network` after `timeout`.
    pub fn with_timeout(
        base_url: impl Into<String>,
        tokens: Arc<dyn TokenStore>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build HTTP client with timeout ({e}), using defaults");
                reqwest::Client::new()
            });
        Self {
            base_url: base_url.into(),
            client,
            tokens,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Joins `path` onto the base URL with exactly one slash between them.
    pub fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, HttpError> {
        let url = self.url(path);
        let mut builder = self.client.request(method.clone(), &url);

        match self.tokens.get() {
            Ok(Some(token)) => {
                builder = builder.header(AUTHORIZATION, format!("Token {token}"));
            }
            Ok(None) => debug!("No token stored, sending {method} {url} anonymously"),
            Err(e) => warn!("Token store unreadable ({e}), sending {method} {url} anonymously"),
        }

        if let Some(body) = body {
            builder = builder.json(body);
        }

        debug!("{method} {url}");
        let response = builder.send().await.map_err(|e| HttpError::Network {
            message: e.to_string(),
        })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| HttpError::Network {
            message: e.to_string(),
        })?;
        debug!("{method} {url} -> {status} ({} bytes)", bytes.len());

        if !status.is_success() {
            let data = decode_body(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
            warn!("{method} {url} failed: {status} {data}");
            return Err(HttpError::Status {
                status: status.as_u16(),
                data,
                message: status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string(),
            });
        }

        decode_body(&bytes).map_err(|e| HttpError::Parse {
            status: status.as_u16(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn execute(&self, request: ApiRequest) -> Result<Value, HttpError> {
        self.request(request.method, &request.path, request.body.as_ref())
            .await
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Empty bodies (204 No Content, bare DELETE responses) decode to `null`.
fn decode_body(bytes: &[u8]) -> Result<Value, serde_json::Error> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes)
}
