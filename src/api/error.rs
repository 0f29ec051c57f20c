//! Failures talking to the meeting backend.

use serde_json::Value;
use thiserror::Error;

/// Why a remote call did not succeed.
///
/// `Rejected` means the backend answered and said no; `Unreachable` means no
/// answer arrived at all. Callers show these differently.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("meeting backend rejected the request (HTTP {status}): {}", .message.as_deref().unwrap_or("no details given"))]
    Rejected {
        status: u16,
        message: Option<String>,
    },

    #[error("meeting backend unreachable: {0}")]
    Unreachable(String),

    #[error("meeting backend sent an unreadable response: {0}")]
    Malformed(String),
}

impl TransportError {
    pub fn rejected(status: u16, body: &str) -> Self {
        Self::Rejected {
            status,
            message: error_message(body),
        }
    }

    pub fn unreachable(err: &reqwest::Error) -> Self {
        Self::Unreachable(describe(err))
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }
}

/// Pull a human-readable message out of an error body.
///
/// Accepts `{"message": ...}`, FastAPI's `{"detail": ...}`, or plain text.
fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => ["message", "detail", "error"]
            .iter()
            .find_map(|key| map.get(*key))
            .map(|value| match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            }),
        Ok(Value::String(text)) => Some(text),
        Ok(_) => None,
        Err(_) => Some(body.to_string()),
    }
}

/// Flatten a reqwest error and its causes into one line.
fn describe(err: &reqwest::Error) -> String {
    let mut text = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}
