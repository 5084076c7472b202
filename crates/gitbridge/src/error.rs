//! Service-level error taxonomy.
//!
//! Services never return these across their public boundary; they are used to
//! classify and log failures, and to pick the generic message handed back to
//! callers in result objects.

use thiserror::Error;

use crate::gitea::GiteaError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum SyncError {
    /// A required administrative setting is missing.
    #[error("Not configured: {0}")]
    NotConfigured(String),

    /// Network failure or timeout talking to Gitea.
    #[error("Gitea unreachable: {0}")]
    RemoteUnreachable(String),

    /// Gitea rejected the request, or input failed local validation.
    #[error("Gitea rejected request ({status}): {message}")]
    RemoteRejected { status: u16, message: String },

    #[error("Gitea reported a conflict: {0}")]
    RemoteConflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A stored correlation is missing one of username/token.
    #[error("Inconsistent local state: {0}")]
    LocalInconsistency(String),

    #[error("User {0} not found")]
    UserNotFound(i32),

    /// Gitea answered with a body we could not decode.
    #[error("Unexpected Gitea response: {0}")]
    Protocol(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<GiteaError> for SyncError {
    fn from(err: GiteaError) -> Self {
        match err {
            GiteaError::Http(msg) | GiteaError::Timeout(msg) => SyncError::RemoteUnreachable(msg),
            GiteaError::Json(e) => SyncError::Protocol(e.to_string()),
            GiteaError::Api { status: 409, message } => SyncError::RemoteConflict(message),
            GiteaError::Api { status: 404, message } => SyncError::NotFound(message),
            GiteaError::Api { status, message } => SyncError::RemoteRejected { status, message },
            // Status 0 marks a rejection made before any request was sent.
            GiteaError::Validation(message) => SyncError::RemoteRejected { status: 0, message },
            GiteaError::NotConfigured(what) => SyncError::NotConfigured(what),
        }
    }
}

impl SyncError {
    /// Generic message safe to show to end users.
    ///
    /// Remote response bodies and configuration details stay in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            SyncError::NotConfigured(_) => "The Git service is not configured.",
            SyncError::RemoteUnreachable(_) => "The Git service is currently unavailable.",
            SyncError::RemoteRejected { .. } => "The Git service rejected the request.",
            SyncError::RemoteConflict(_) => "The requested name is already taken.",
            SyncError::NotFound(_) => "The requested resource was not found.",
            SyncError::LocalInconsistency(_) | SyncError::Protocol(_) | SyncError::Store(_) => {
                "An internal error occurred."
            }
            SyncError::UserNotFound(_) => "User not found.",
        }
    }

    /// Short name of the category, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::NotConfigured(_) => "not_configured",
            SyncError::RemoteUnreachable(_) => "remote_unreachable",
            SyncError::RemoteRejected { .. } => "remote_rejected",
            SyncError::RemoteConflict(_) => "remote_conflict",
            SyncError::NotFound(_) => "not_found",
            SyncError::LocalInconsistency(_) => "local_inconsistency",
            SyncError::UserNotFound(_) => "user_not_found",
            SyncError::Protocol(_) => "protocol",
            SyncError::Store(_) => "store",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16) -> GiteaError {
        GiteaError::Api {
            status,
            message: "remote body with internals".to_string(),
        }
    }

    #[test]
    fn classifies_gitea_errors() {
        assert!(matches!(SyncError::from(api(409)), SyncError::RemoteConflict(_)));
        assert!(matches!(SyncError::from(api(404)), SyncError::NotFound(_)));
        assert!(matches!(
            SyncError::from(api(422)),
            SyncError::RemoteRejected { status: 422, .. }
        ));
        assert!(matches!(
            SyncError::from(api(503)),
            SyncError::RemoteRejected { status: 503, .. }
        ));
        assert!(matches!(
            SyncError::from(GiteaError::Timeout("slow".to_string())),
            SyncError::RemoteUnreachable(_)
        ));
        assert!(matches!(
            SyncError::from(GiteaError::Validation("short password".to_string())),
            SyncError::RemoteRejected { status: 0, .. }
        ));
        assert!(matches!(
            SyncError::from(GiteaError::NotConfigured("admin_token".to_string())),
            SyncError::NotConfigured(_)
        ));
    }

    #[test]
    fn bad_json_is_a_protocol_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").expect_err("invalid json");
        let err = SyncError::from(GiteaError::Json(json_err));
        assert_eq!(err.kind(), "protocol");
    }

    #[test]
    fn public_message_hides_remote_details() {
        let err = SyncError::from(api(422));
        assert!(!err.public_message().contains("internals"));
        assert!(err.to_string().contains("internals"));
        assert_eq!(SyncError::UserNotFound(3).public_message(), "User not found.");
    }
}
