//! Repository synchronization.
//!
//! The single orchestration point for operations that span the platform and
//! Gitea: repository creation (remote first, then local record and mapping),
//! and read-through queries for listings, branches, commits and contents.
//!
//! Every public operation is fail-soft: errors are classified, logged with
//! the operation name, and turned into an empty value or a failed
//! [`RepositoryResult`].

mod service;

use serde::Serialize;

use crate::descriptor::RepositoryDescriptor;
use crate::error::SyncError;

pub use service::{DEFAULT_COMMIT_LIMIT, RepositorySyncService};

/// Outcome of [`RepositorySyncService::create_repository`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryResult {
    pub success: bool,
    pub repository: Option<RepositoryDescriptor>,
    pub local_repository_id: Option<i32>,
    pub mapping_id: Option<i32>,
    /// Generic, user-presentable failure message.
    pub error_message: Option<String>,
}

impl RepositoryResult {
    pub fn created(repository: RepositoryDescriptor, local_repository_id: i32, mapping_id: i32) -> Self {
        Self {
            success: true,
            repository: Some(repository),
            local_repository_id: Some(local_repository_id),
            mapping_id: Some(mapping_id),
            error_message: None,
        }
    }

    pub fn failed(err: &SyncError) -> Self {
        Self {
            success: false,
            repository: None,
            local_repository_id: None,
            mapping_id: None,
            error_message: Some(format!("Repository creation failed: {}", err.public_message())),
        }
    }
}

/// Log a failed operation and fall back to the empty value.
///
/// Configuration gaps and local persistence failures log at `error`; remote
/// problems at `warn`.
pub(crate) fn fail_soft<T: Default>(operation: &'static str, result: Result<T, SyncError>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            match &e {
                SyncError::NotConfigured(_) | SyncError::Store(_) | SyncError::LocalInconsistency(_) => {
                    tracing::error!(operation, kind = e.kind(), error = %e, "Operation failed");
                }
                _ => tracing::warn!(operation, kind = e.kind(), error = %e, "Operation failed"),
            }
            T::default()
        }
    }
}
