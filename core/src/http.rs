//! HTTP transport types and the blocking transport used by `GameClient`.
//!
//! # Design
//! Requests and responses are plain data. The client core builds an
//! `HttpRequest`, hands it to a `Transport`, and classifies the returned
//! `HttpResponse` itself. Swapping the transport (for a recording stub in
//! tests, or a host-provided executor) never touches the marshaling logic.

use std::fmt;

use tracing::debug;
use ureq::typestate::{WithBody, WithoutBody};
use ureq::{Agent, RequestBuilder};

use crate::config::ClientConfig;
use crate::error::ApiError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// An HTTP response described as plain data. `body` holds the full payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Executes one request synchronously.
///
/// Implementations must return every status code as data. Only failures to
/// build, send, or read a request are errors here; status interpretation
/// belongs to the client core.
#[cfg_attr(test, mockall::automock)]
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// Blocking transport backed by a `ureq` agent.
///
/// Response bodies are read in full; ureq's default 10 MB read cap is lifted.
#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::from_config(&ClientConfig::default())
    }

    /// Builds the agent with the configured timeouts. ureq's
    /// status-code-as-error behavior is disabled so 4xx/5xx bodies reach
    /// the core's error envelope handling.
    pub fn from_config(config: &ClientConfig) -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(config.timeout_connect)
            .timeout_global(config.timeout_global)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let url = request.url.as_str();
        let headers = request.headers.as_slice();

        let result = match (request.method, request.body.as_deref()) {
            (HttpMethod::Get, _) => without_body(self.agent.get(url), headers).call(),
            (HttpMethod::Delete, _) => without_body(self.agent.delete(url), headers).call(),
            (HttpMethod::Post, Some(body)) => with_body(self.agent.post(url), headers).send(body),
            (HttpMethod::Post, None) => with_body(self.agent.post(url), headers).send_empty(),
        };

        let mut response = result.map_err(|e| match e {
            ureq::Error::BadUri(_) | ureq::Error::Http(_) => ApiError::RequestError(e.to_string()),
            other => ApiError::TransportError(other.to_string()),
        })?;

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_vec()
            .map_err(|e| ApiError::ReadError(e.to_string()))?;
        debug!(status, len = body.len(), "response body read");

        Ok(HttpResponse { status, body })
    }
}

fn without_body(
    mut builder: RequestBuilder<WithoutBody>,
    headers: &[(String, String)],
) -> RequestBuilder<WithoutBody> {
    for (key, value) in headers {
        builder = builder.header(key.as_str(), value.as_str());
    }
    builder
}

fn with_body(
    mut builder: RequestBuilder<WithBody>,
    headers: &[(String, String)],
) -> RequestBuilder<WithBody> {
    for (key, value) in headers {
        builder = builder.header(key.as_str(), value.as_str());
    }
    builder
}
