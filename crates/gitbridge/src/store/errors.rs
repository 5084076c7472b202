use sea_orm::DbErr;
use thiserror::Error;

/// Errors from the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sea-orm.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Not found: {context}")]
    NotFound { context: String },

    /// A uniqueness rule would be violated.
    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
}

impl StoreError {
    pub fn not_found(context: impl Into<String>) -> Self {
        Self::NotFound {
            context: context.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Map unique-constraint violations to [`StoreError::Conflict`].
    pub(crate) fn from_write(err: DbErr, what: &str) -> Self {
        match err.sql_err() {
            Some(sea_orm::SqlErr::UniqueConstraintViolation(detail)) => Self::Conflict {
                message: format!("{}: {}", what, detail),
            },
            _ => Self::Database(err),
        }
    }
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_carries_context() {
        let msg = StoreError::not_found("mapping id=42").to_string();
        assert!(msg.contains("not found") || msg.contains("Not found"));
        assert!(msg.contains("mapping id=42"));
    }

    #[test]
    fn plain_db_errors_stay_database_errors() {
        let err = StoreError::from_write(DbErr::Custom("boom".to_string()), "user");
        assert!(matches!(err, StoreError::Database(_)));
    }
}
