//! Error types for GitLab operations

use reqwest::StatusCode;
use thiserror::Error;

/// Result type for GitLab operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during GitLab operations
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level failure
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// GitLab answered with a non-success status
    #[error("GitLab API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Authentication error
    #[error("GitLab authentication error: {0}")]
    Auth(String),

    /// Group not found
    #[error("Group not found: {0}")]
    GroupNotFound(String),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid instance URL
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Client could not be set up
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Classify an HTTP status code and response body into a typed error
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = api_message(body);
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Error::Auth(format!("{}: {}", status, message))
        } else {
            Error::Api {
                status: status.as_u16(),
                message,
            }
        }
    }

    /// HTTP status GitLab answered with, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<Error> for drover_core::Error {
    fn from(err: Error) -> Self {
        drover_core::Error::Host(err.to_string())
    }
}

/// Pull the human-readable part out of a GitLab error body
///
/// GitLab reports errors as `{"message": ...}` or `{"error": ...}`; anything
/// else is returned as-is, truncated.
pub(crate) fn api_message(body: &str) -> String {
    const MAX: usize = 500;

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error"] {
            match value.get(key) {
                Some(serde_json::Value::String(s)) => return s.clone(),
                Some(other) if !other.is_null() => return other.to_string(),
                _ => {}
            }
        }
    }

    let body = body.trim();
    if body.len() > MAX {
        let cut = (0..=MAX).rev().find(|i| body.is_char_boundary(*i)).unwrap_or(0);
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}
