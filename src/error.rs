//! # Error Handling
//!
//! Unified error types for the blueprint client. Remote failures keep the
//! server's own message (when one can be found in the body) so the editor can
//! surface it verbatim; everything else falls back to a caller-chosen text.

use serde_json::Value;
use thiserror::Error;

use crate::connectors::RegistryError;

/// Failure of a single request/response exchange with the backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RemoteError {
    #[error("HTTP error {status}: {}", .message.as_deref().unwrap_or("No message"))]
    Http {
        status: u16,
        message: Option<String>,
    },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl RemoteError {
    /// Build an HTTP error from a non-success status and its raw body.
    pub fn from_body(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|value| extract_message(&value));
        RemoteError::Http { status, message }
    }

    /// Message supplied by the server, if the body carried one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            RemoteError::Http { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Server message verbatim, or `fallback` when there is none.
    pub fn user_message(&self, fallback: &str) -> String {
        self.server_message()
            .map(str::to_string)
            .unwrap_or_else(|| fallback.to_string())
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RemoteError::MalformedResponse(err.to_string())
        } else if let Some(status) = err.status() {
            RemoteError::Http {
                status: status.as_u16(),
                message: None,
            }
        } else {
            RemoteError::Network(err.to_string())
        }
    }
}

/// Pull a human-readable message out of an error body.
///
/// Lookup order: `data.message`, `message`, `error`. NestJS validation
/// failures send `message` as an array of strings; those are joined.
pub fn extract_message(value: &Value) -> Option<String> {
    let candidates = [
        value.get("data").and_then(|data| data.get("message")),
        value.get("message"),
        value.get("error"),
    ];

    candidates.into_iter().flatten().find_map(message_text)
}

fn message_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Array(items) => {
            let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
        _ => None,
    }
}

/// Errors surfaced by graph operations.
#[derive(Debug, Error)]
pub enum BlueprintError {
    /// Detected locally before any remote call; the text is user-facing.
    #[error("{0}")]
    Precondition(String),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("node '{0}' not found")]
    NodeNotFound(String),
    #[error("edge '{0}' not found")]
    EdgeNotFound(String),
    #[error("invalid node template: {0}")]
    InvalidTemplate(String),
    #[error("invalid api base url '{value}': {source}")]
    InvalidBaseUrl {
        value: String,
        source: url::ParseError,
    },
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

impl BlueprintError {
    pub fn precondition<S: Into<String>>(message: S) -> Self {
        BlueprintError::Precondition(message.into())
    }

    /// Text to show the user for this failure.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            BlueprintError::Precondition(message) => message.clone(),
            BlueprintError::Remote(remote) => remote.user_message(fallback),
            _ => fallback.to_string(),
        }
    }
}
