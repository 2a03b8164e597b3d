//! Error types for the tic-tac-toe client.
//!
//! # Design
//! Failures split into two kinds. Local failures (the payload could not be
//! encoded, the request could not be built or sent, or the response did not
//! match the expected shape) all report `CLIENT_ERROR` as their code.
//! Remote failures carry the code from the service's error envelope
//! unchanged; the client never interprets them.

use thiserror::Error;

/// Code reported by every error that originates in the client or transport.
pub const CLIENT_ERROR_CODE: &str = "CLIENT_ERROR";

/// Errors returned by `GameClient` operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// The outbound request could not be constructed (bad URL, bad header).
    #[error("invalid request: {0}")]
    RequestError(String),

    /// The round trip failed below HTTP: DNS, connect, TLS, timeout.
    #[error("transport failed: {0}")]
    TransportError(String),

    /// The response body could not be read.
    #[error("reading response failed: {0}")]
    ReadError(String),

    /// A response body did not match the expected success or error shape.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The service rejected the call with a structured error envelope.
    /// `message` is already formatted as `"{code}: {message}"`.
    #[error("{message}")]
    RemoteError {
        status: u16,
        code: String,
        message: String,
    },
}

impl ApiError {
    pub(crate) fn remote(status: u16, code: String, message: &str) -> Self {
        let message = format!("{code}: {message}");
        ApiError::RemoteError {
            status,
            code,
            message,
        }
    }

    /// Machine-readable code: `CLIENT_ERROR` for local failures, the
    /// service's code otherwise.
    pub fn code(&self) -> &str {
        match self {
            ApiError::RemoteError { code, .. } => code,
            _ => CLIENT_ERROR_CODE,
        }
    }

    /// Human-readable message without the variant prefix used by `Display`.
    pub fn message(&self) -> &str {
        match self {
            ApiError::SerializationError(msg)
            | ApiError::RequestError(msg)
            | ApiError::TransportError(msg)
            | ApiError::ReadError(msg)
            | ApiError::DeserializationError(msg) => msg,
            ApiError::RemoteError { message, .. } => message,
        }
    }

    /// HTTP status of a remote failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::RemoteError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the client or transport broke rather than the service
    /// rejecting the call. These are the candidates for a retry.
    pub fn is_local(&self) -> bool {
        !self.is_remote()
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, ApiError::RemoteError { .. })
    }
}
