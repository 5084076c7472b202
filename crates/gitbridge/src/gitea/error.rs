//! Error types for Gitea API operations.

use thiserror::Error;

use crate::http::HttpError;

/// Errors that can occur when interacting with the Gitea API.
#[derive(Debug, Error)]
pub enum GiteaError {
    /// Transport-level failure (DNS, connection refused, TLS).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The request did not complete within its time bound.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned a non-success response.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Input rejected locally before any request was made.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A required credential or setting is missing.
    #[error("Not configured: {0}")]
    NotConfigured(String),
}

impl From<HttpError> for GiteaError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Timeout(msg) => GiteaError::Timeout(msg),
            other => GiteaError::Http(other.to_string()),
        }
    }
}

impl GiteaError {
    /// HTTP status of an API error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            GiteaError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Transport failures and server-side errors are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            GiteaError::Http(_) | GiteaError::Timeout(_) => true,
            GiteaError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Get a short error message suitable for display.
pub fn short_error_message(err: &GiteaError) -> String {
    match err {
        GiteaError::Http(_) => "Network error".to_string(),
        GiteaError::Timeout(_) => "Timed out".to_string(),
        GiteaError::Json(_) => "JSON parse error".to_string(),
        GiteaError::Api { status, message } => {
            if message.len() > 50 {
                let truncated: String = message.chars().take(47).collect();
                format!("HTTP {}: {}...", status, truncated)
            } else {
                format!("HTTP {}: {}", status, message)
            }
        }
        GiteaError::Validation(msg) => format!("Invalid input: {}", msg),
        GiteaError::NotConfigured(what) => format!("Not configured: {}", what),
    }
}
