//! Gateway Error Types
//!
//! Every failed call is reduced to one `ApiError` carrying an
//! `ErrorKind`, a user-facing message and, when the server sent one, its
//! status and error code.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Failure taxonomy of the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Markup instead of JSON, or the server could not be reached
    ServerUnreachable,
    /// The server rejected the credential (401)
    SessionExpired,
    /// The body could not be decoded
    MalformedResponse,
    /// Non-2xx status with a structured body
    RequestFailed,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ServerUnreachable => "server_unreachable",
            ErrorKind::SessionExpired => "session_expired",
            ErrorKind::MalformedResponse => "malformed_response",
            ErrorKind::RequestFailed => "request_failed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform failure shape returned by every gateway operation
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("{message}")]
pub struct ApiError {
    #[serde(rename = "error")]
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Machine-readable code from the server body (`invalid`, `exists`, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            code: None,
        }
    }

    pub fn server_unreachable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServerUnreachable, message)
    }

    pub fn session_expired() -> Self {
        Self::new(
            ErrorKind::SessionExpired,
            "Your session has expired. Please log in again.",
        )
        .with_status(401)
    }

    pub fn malformed_response() -> Self {
        Self::new(
            ErrorKind::MalformedResponse,
            "Received an invalid response from the server. Please try again later.",
        )
    }

    pub fn request_failed(status: u16, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RequestFailed, message).with_status(status)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_code(mut self, code: Option<String>) -> Self {
        self.code = code;
        self
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        let message = if e.is_timeout() {
            "The server did not respond in time.".to_string()
        } else if e.is_connect() {
            "Unable to connect to the server.".to_string()
        } else {
            format!("Request failed: {}", e)
        };
        let error = ApiError::server_unreachable(message);
        match e.status() {
            Some(status) => error.with_status(status.as_u16()),
            None => error,
        }
    }
}

/// Result type for gateway operations
pub type ApiResult<T> = Result<T, ApiError>;
