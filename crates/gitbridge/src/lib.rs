//! Gitbridge - shadow Gitea accounts and repository synchronization.
//!
//! Platform users get a correlated Gitea account ("shadow account") created
//! on demand. Repositories are created on Gitea first and then recorded
//! locally together with a mapping to the remote repository. Listings,
//! branches, commits and file contents are read through to Gitea.
//!
//! # Features
//!
//! - `migrate` - Enables database migration support. When enabled, you can use
//!   [`connect_and_migrate`] to automatically run migrations on connection.
//! - `sqlite` / `postgres` - Database backends.
//!
//! # Example
//!
//! ```ignore
//! use gitbridge::{GiteaClient, GiteaSettings, RepositorySyncService, ShadowAccountService};
//!
//! let db = gitbridge::connect_and_migrate("sqlite://gitbridge.db?mode=rwc").await?;
//! let client = GiteaClient::new(GiteaSettings::new("https://git.example.com"))?;
//! let sync = RepositorySyncService::new(ShadowAccountService::new(db, client));
//!
//! let result = sync.create_repository(1, "demo", "", false).await;
//! ```

pub mod db;
pub mod descriptor;
pub mod diagnostics;
pub mod entity;
pub mod error;
pub mod gitea;
pub mod http;
pub mod provisioning;
pub mod retry;
pub mod store;
pub mod sync;

#[cfg(feature = "migrate")]
pub mod migration;

pub use db::connect;
#[cfg(feature = "migrate")]
pub use db::connect_and_migrate;
pub use descriptor::{RepositoryDescriptor, RepositoryUrls};
pub use diagnostics::{AuditReport, ConsistencyAuditor};
pub use entity::prelude::*;
pub use error::SyncError;
pub use gitea::{GiteaClient, GiteaError, GiteaSettings};
pub use provisioning::{ProvisioningOptions, ShadowAccountResult, ShadowAccountService};
pub use store::StoreError;
pub use sync::{RepositoryResult, RepositorySyncService};

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use crate::gitea::{GiteaClient, GiteaSettings};
    use crate::http::MockTransport;

    pub const BASE: &str = "https://git.test/api/v1";

    pub fn settings() -> GiteaSettings {
        GiteaSettings {
            base_url: "https://git.test/".to_string(),
            admin_username: Some("root".to_string()),
            admin_password: Some("rootpass".to_string()),
            admin_token: Some("admin-token".to_string()),
            sync_domain: "sync.test".to_string(),
            ..GiteaSettings::default()
        }
    }

    pub fn mock_client(settings: GiteaSettings) -> (GiteaClient, MockTransport) {
        let transport = MockTransport::new();
        let client = GiteaClient::new_with_transport(settings, Arc::new(transport.clone()));
        (client, transport)
    }

    #[cfg(all(feature = "sqlite", feature = "migrate"))]
    pub use self::db::*;

    #[cfg(all(feature = "sqlite", feature = "migrate"))]
    mod db {
        use sea_orm::DatabaseConnection;

        use crate::entity::user::Model as UserModel;
        use crate::store::{NewUser, users};

        pub async fn test_db() -> DatabaseConnection {
            crate::connect_and_migrate("sqlite::memory:")
                .await
                .expect("in-memory database should migrate")
        }

        pub async fn seed_user(db: &DatabaseConnection, username: &str) -> UserModel {
            users::insert(
                db,
                NewUser {
                    username: username.to_string(),
                    email: format!("{username}@example.com"),
                    display_name: None,
                },
            )
            .await
            .expect("seed user")
        }

        pub async fn correlate(db: &DatabaseConnection, user_id: i32, username: &str, token: &str) {
            let stored = users::set_correlation_if_absent(db, user_id, username, token)
                .await
                .expect("store correlation");
            assert!(stored, "user {user_id} was already correlated");
        }
    }
}
