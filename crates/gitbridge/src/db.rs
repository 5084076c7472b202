//! Database connection utilities.

use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

/// SQLite pragmas applied to file-backed databases.
const SQLITE_PRAGMAS: &[&str] = &[
    "PRAGMA journal_mode=WAL",
    "PRAGMA busy_timeout=5000",
    "PRAGMA synchronous=NORMAL",
];

async fn configure_sqlite(db: &DatabaseConnection) -> Result<(), DbErr> {
    for pragma in SQLITE_PRAGMAS {
        db.execute(Statement::from_string(
            db.get_database_backend(),
            pragma.to_string(),
        ))
        .await?;
    }
    Ok(())
}

/// Establish a connection to the database.
///
/// File-backed SQLite databases get WAL mode, a 5 second busy timeout and
/// `synchronous=NORMAL`.
///
/// # Errors
/// Returns `DbErr` if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;

    if database_url.starts_with("sqlite://") {
        configure_sqlite(&db).await?;
    }

    tracing::debug!(backend = ?db.get_database_backend(), "Database connected");
    Ok(db)
}

/// Establish a connection and run all pending migrations.
///
/// # Example
/// ```ignore
/// let db = gitbridge::connect_and_migrate("sqlite://gitbridge.db?mode=rwc").await?;
/// ```
#[cfg(feature = "migrate")]
pub async fn connect_and_migrate(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    use sea_orm_migration::MigratorTrait;

    let db = connect(database_url).await?;
    crate::migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    #[tokio::test]
    async fn configure_sqlite_runs_all_pragmas() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_exec_results(SQLITE_PRAGMAS.iter().map(|_| MockExecResult {
                rows_affected: 0,
                last_insert_id: 0,
            }))
            .into_connection();

        configure_sqlite(&db)
            .await
            .expect("mock sqlite pragma execs should succeed");

        let log = db.into_transaction_log();
        assert_eq!(log.len(), SQLITE_PRAGMAS.len());
    }

    #[tokio::test]
    async fn connect_returns_error_for_invalid_database_url() {
        let err = connect("this-is-not-a-db-url")
            .await
            .expect_err("invalid URL should error");
        assert!(!err.to_string().is_empty());
    }

    #[cfg(all(feature = "sqlite", feature = "migrate"))]
    #[tokio::test]
    async fn in_memory_database_migrates() {
        use sea_orm::EntityTrait;

        let db = connect_and_migrate("sqlite::memory:")
            .await
            .expect("in-memory sqlite should migrate");
        let users = crate::entity::user::Entity::find()
            .all(&db)
            .await
            .expect("users table exists");
        assert!(users.is_empty());
    }
}
