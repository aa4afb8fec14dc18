//! Errors returned by the hosting clients

use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized ({status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("request failed ({status}): {message}")]
    Status { status: u16, message: String },

    #[error("domain {domain:?} is not supported by this client (client domain: {supported})")]
    DomainUnsupported { domain: String, supported: String },

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("git command failed: {0}")]
    Git(String),
}

impl ApiError {
    /// True when the backend reported that the resource does not exist (yet).
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }

    /// Status code reported by the backend, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::NotFound(_) => Some(404),
            ApiError::Unauthorized { status, .. } | ApiError::Status { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    pub(crate) fn from_response(status: StatusCode, body: &str) -> Self {
        let message = extract_message(body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string());

        match status {
            StatusCode::NOT_FOUND => ApiError::NotFound(message),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized {
                status: status.as_u16(),
                message,
            },
            _ => ApiError::Status {
                status: status.as_u16(),
                message,
            },
        }
    }
}

/// Pull a human readable message out of an error body.
///
/// GitHub, GitLab and Azure DevOps use a top-level `message` field, GitLab
/// validation failures use `error`, Bitbucket Server nests them in `errors`.
fn extract_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    let value: serde_json::Value = match serde_json::from_str(trimmed) {
        Ok(value) => value,
        Err(_) => return Some(trimmed.to_string()),
    };

    let text = |v: &serde_json::Value| match v {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    };

    if let Some(message) = value.get("message").and_then(text) {
        return Some(message);
    }
    if let Some(error) = value.get("error").and_then(text) {
        return Some(error);
    }
    value
        .get("errors")
        .and_then(|errors| errors.get(0))
        .and_then(|first| first.get("message"))
        .and_then(text)
        .or_else(|| Some(trimmed.to_string()))
}
