use std::sync::Arc;

use sea_orm::DatabaseConnection;

use super::{
    ProvisioningOptions, ShadowAccountResult, ShadowCredential, derive_shadow_username,
    generate_password,
};
use crate::entity::user::{Model as UserModel, ShadowCorrelation};
use crate::error::SyncError;
use crate::gitea::{GiteaClient, GiteaError, UserCreation, short_error_message};
use crate::retry::with_retry;
use crate::store::users;

/// Ensures platform users have a usable Gitea account and token.
#[derive(Debug, Clone)]
pub struct ShadowAccountService {
    db: Arc<DatabaseConnection>,
    client: GiteaClient,
    options: ProvisioningOptions,
}

impl ShadowAccountService {
    pub fn new(db: impl Into<Arc<DatabaseConnection>>, client: GiteaClient) -> Self {
        Self::with_options(db, client, ProvisioningOptions::default())
    }

    pub fn with_options(
        db: impl Into<Arc<DatabaseConnection>>,
        client: GiteaClient,
        options: ProvisioningOptions,
    ) -> Self {
        Self {
            db: db.into(),
            client,
            options,
        }
    }

    pub fn client(&self) -> &GiteaClient {
        &self.client
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Make sure `user_id` has a correlated Gitea account and token.
    ///
    /// Users that already carry a complete correlation are answered without
    /// any remote call. Never fails; the cause of a failure is logged and a
    /// generic message is returned.
    #[tracing::instrument(skip(self))]
    pub async fn ensure_shadow_account(&self, user_id: i32) -> ShadowAccountResult {
        match self.ensure(user_id).await {
            Ok(credential) => ShadowAccountResult::succeeded(credential),
            Err(e) => {
                tracing::warn!(user_id, kind = e.kind(), error = %e, "Shadow account provisioning failed");
                ShadowAccountResult::failed(&e)
            }
        }
    }

    /// Same as [`ensure_shadow_account`](Self::ensure_shadow_account) but
    /// keeps the classified error.
    pub(crate) async fn ensure(&self, user_id: i32) -> Result<ShadowCredential, SyncError> {
        let user = users::find_by_id(self.db(), user_id)
            .await?
            .ok_or(SyncError::UserNotFound(user_id))?;

        match user.shadow_correlation() {
            ShadowCorrelation::Complete { username, token } => {
                return Ok(ShadowCredential {
                    username: username.to_string(),
                    access_token: token.to_string(),
                });
            }
            ShadowCorrelation::Partial => {
                let inconsistency = SyncError::LocalInconsistency(format!(
                    "user {} has a partial shadow-account correlation",
                    user_id
                ));
                tracing::warn!(user_id, kind = inconsistency.kind(), "{}; reprovisioning", inconsistency);
            }
            ShadowCorrelation::Absent => {}
        }

        self.provision(&user).await
    }

    async fn provision(&self, user: &UserModel) -> Result<ShadowCredential, SyncError> {
        let username = derive_shadow_username(&user.username, user.id);
        let password = generate_password();

        tracing::info!(user_id = user.id, gitea_username = %username, "Provisioning shadow account");

        let creation = self
            .client
            .create_user(
                &username,
                &user.email,
                &password,
                user.display_name_or_username(),
            )
            .await?;

        let token = match self.mint_token(&username, &password).await {
            Ok(token) => token,
            Err(e) => {
                if creation == UserCreation::Created {
                    self.discard_account(&username).await;
                } else {
                    tracing::warn!(
                        user_id = user.id,
                        gitea_username = %username,
                        "Existing Gitea account could not be used: token minting failed"
                    );
                }
                return Err(e.into());
            }
        };

        let persisted = self.persist_correlation(user.id, &username, &token).await;
        if persisted.is_err() && creation == UserCreation::Created {
            self.discard_account(&username).await;
        }
        persisted
    }

    async fn mint_token(&self, username: &str, password: &str) -> Result<String, GiteaError> {
        let label = format!(
            "{}-{}",
            self.options.token_label_prefix,
            &uuid::Uuid::new_v4().simple().to_string()[..8]
        );

        with_retry(
            || self.client.issue_token(username, password, &label),
            GiteaError::is_retryable,
            short_error_message,
            "issue_token",
            self.options.token_retry(),
        )
        .await
    }

    /// Delete an account this call created but could not correlate.
    async fn discard_account(&self, username: &str) {
        match self.client.delete_user(username).await {
            Ok(()) => tracing::info!(gitea_username = %username, "Deleted unusable shadow account"),
            Err(e) => tracing::error!(
                gitea_username = %username,
                error = %e,
                "Failed to delete unusable shadow account"
            ),
        }
    }

    /// Write the correlation unless another provisioning got there first, in
    /// which case the stored correlation wins and `token` is dropped.
    async fn persist_correlation(
        &self,
        user_id: i32,
        username: &str,
        token: &str,
    ) -> Result<ShadowCredential, SyncError> {
        let written = users::set_correlation_if_absent(self.db(), user_id, username, token)
            .await
            .inspect_err(|e| {
                tracing::error!(user_id, gitea_username = %username, error = %e, "Failed to store shadow correlation");
            })?;

        if written {
            tracing::info!(user_id, gitea_username = %username, "Shadow account ready");
            return Ok(ShadowCredential {
                username: username.to_string(),
                access_token: token.to_string(),
            });
        }

        let current = users::find_by_id(self.db(), user_id)
            .await?
            .ok_or(SyncError::UserNotFound(user_id))?;
        match current.shadow_correlation() {
            ShadowCorrelation::Complete { username: stored, token: stored_token } => {
                tracing::info!(
                    user_id,
                    gitea_username = %stored,
                    "Concurrent provisioning already stored a correlation; discarding new token"
                );
                Ok(ShadowCredential {
                    username: stored.to_string(),
                    access_token: stored_token.to_string(),
                })
            }
            _ => Err(SyncError::LocalInconsistency(format!(
                "correlation for user {} was neither written nor present",
                user_id
            ))),
        }
    }
}

#[cfg(all(test, feature = "sqlite", feature = "migrate"))]
mod tests {
    use super::*;
    use crate::http::HttpMethod;
    use crate::test_support::{BASE, mock_client, seed_user, settings, test_db};
    use serde_json::json;

    fn fast_options() -> ProvisioningOptions {
        ProvisioningOptions {
            retry_min_delay_ms: 1,
            retry_max_delay_ms: 2,
            ..ProvisioningOptions::default()
        }
    }

    async fn service() -> (ShadowAccountService, crate::http::MockTransport, i32) {
        let db = test_db().await;
        let user = seed_user(&db, "alice").await;
        let (client, transport) = mock_client(settings());
        (
            ShadowAccountService::with_options(db, client, fast_options()),
            transport,
            user.id,
        )
    }

    fn push_created(transport: &crate::http::MockTransport) {
        transport.push_json(HttpMethod::Post, format!("{BASE}/admin/users"), 201, json!({"id": 10, "login": "alice"}));
    }

    fn push_token(transport: &crate::http::MockTransport, token: &str) {
        transport.push_json(
            HttpMethod::Post,
            format!("{BASE}/users/alice/tokens"),
            201,
            json!({"id": 1, "name": "gitbridge", "sha1": token}),
        );
    }

    #[tokio::test]
    async fn provisions_once_and_reuses_correlation() {
        let (service, transport, user_id) = service().await;
        push_created(&transport);
        push_token(&transport, "tok-1");

        let first = service.ensure_shadow_account(user_id).await;
        assert!(first.success, "{first:?}");
        assert_eq!(first.username.as_deref(), Some("alice"));
        assert_eq!(first.access_token.as_deref(), Some("tok-1"));

        let second = service.ensure_shadow_account(user_id).await;
        assert_eq!(second, first);

        assert_eq!(transport.count(HttpMethod::Post, &format!("{BASE}/admin/users")), 1);
        assert_eq!(transport.count(HttpMethod::Post, &format!("{BASE}/users/alice/tokens")), 1);

        let stored = users::find_by_id(service.db(), user_id)
            .await
            .expect("query")
            .expect("user");
        assert_eq!(stored.gitea_username.as_deref(), Some("alice"));
        assert_eq!(stored.gitea_access_token.as_deref(), Some("tok-1"));
    }

    #[tokio::test]
    async fn unknown_user_fails_without_remote_calls() {
        let (service, transport, user_id) = service().await;
        let result = service.ensure_shadow_account(user_id + 1000).await;
        assert!(!result.success);
        assert_eq!(result.error_message.as_deref(), Some("User not found."));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn conflict_on_creation_proceeds_to_token() {
        let (service, transport, user_id) = service().await;
        transport.push_json(HttpMethod::Post, format!("{BASE}/admin/users"), 409, json!({"message": "exists"}));
        push_token(&transport, "tok-409");

        let result = service.ensure_shadow_account(user_id).await;
        assert!(result.success);
        assert_eq!(result.access_token.as_deref(), Some("tok-409"));
    }

    #[tokio::test]
    async fn fallback_email_path_succeeds() {
        let (service, transport, user_id) = service().await;
        let url = format!("{BASE}/admin/users");
        transport.push_json(HttpMethod::Post, url.clone(), 422, json!({"message": "email rejected"}));
        transport.push_json(HttpMethod::Post, url.clone(), 201, json!({}));
        push_token(&transport, "tok-fallback");

        let result = service.ensure_shadow_account(user_id).await;
        assert!(result.success);

        let posts: Vec<_> = transport
            .requests()
            .into_iter()
            .filter(|r| r.url == url)
            .collect();
        assert_eq!(posts.len(), 2);
        let second: serde_json::Value = serde_json::from_slice(&posts[1].body).expect("json");
        assert_eq!(second["email"], "alice@sync.test");
    }

    #[tokio::test]
    async fn creation_failure_leaves_user_untouched() {
        let (service, transport, user_id) = service().await;
        let url = format!("{BASE}/admin/users");
        transport.push_json(HttpMethod::Post, url.clone(), 500, json!({}));
        transport.push_json(HttpMethod::Post, url, 500, json!({}));

        let result = service.ensure_shadow_account(user_id).await;
        assert!(!result.success);
        assert_eq!(
            result.error_message.as_deref(),
            Some("The Git service rejected the request.")
        );
        assert_eq!(transport.count(HttpMethod::Post, &format!("{BASE}/users/")), 0);

        let stored = users::find_by_id(service.db(), user_id)
            .await
            .expect("query")
            .expect("user");
        assert!(stored.gitea_username.is_none());
        assert!(stored.gitea_access_token.is_none());
    }

    #[tokio::test]
    async fn token_failure_deletes_freshly_created_account() {
        let (service, transport, user_id) = service().await;
        push_created(&transport);
        transport.push_json(HttpMethod::Post, format!("{BASE}/users/alice/tokens"), 401, json!({}));
        transport.push_response(
            HttpMethod::Delete,
            format!("{BASE}/admin/users/alice"),
            crate::http::HttpResponse {
                status: 204,
                headers: Vec::new(),
                body: Vec::new(),
            },
        );

        let result = service.ensure_shadow_account(user_id).await;
        assert!(!result.success);
        // 401 is not retried
        assert_eq!(transport.count(HttpMethod::Post, &format!("{BASE}/users/alice/tokens")), 1);
        assert_eq!(transport.count(HttpMethod::Delete, &format!("{BASE}/admin/users/alice")), 1);
    }

    #[tokio::test]
    async fn token_failure_keeps_preexisting_account() {
        let (service, transport, user_id) = service().await;
        transport.push_json(HttpMethod::Post, format!("{BASE}/admin/users"), 409, json!({}));
        transport.push_json(HttpMethod::Post, format!("{BASE}/users/alice/tokens"), 401, json!({}));

        let result = service.ensure_shadow_account(user_id).await;
        assert!(!result.success);
        assert_eq!(transport.count(HttpMethod::Delete, BASE), 0);
    }

    #[tokio::test]
    async fn transient_token_failure_is_retried_with_same_password() {
        let (service, transport, user_id) = service().await;
        push_created(&transport);
        transport.push_json(HttpMethod::Post, format!("{BASE}/users/alice/tokens"), 502, json!({}));
        push_token(&transport, "tok-retry");

        let result = service.ensure_shadow_account(user_id).await;
        assert!(result.success, "{result:?}");
        assert_eq!(result.access_token.as_deref(), Some("tok-retry"));

        let auths: Vec<_> = transport
            .requests()
            .into_iter()
            .filter(|r| r.url.ends_with("/tokens"))
            .filter_map(|r| r.header("authorization").map(str::to_string))
            .collect();
        assert_eq!(auths.len(), 2);
        assert_eq!(auths[0], auths[1]);
    }

    #[tokio::test]
    async fn partial_correlation_is_treated_as_absent() {
        use sea_orm::{ActiveModelTrait, IntoActiveModel, Set};

        let (service, transport, user_id) = service().await;
        let user = users::find_by_id(service.db(), user_id)
            .await
            .expect("query")
            .expect("user");
        let mut active = user.into_active_model();
        active.gitea_username = Set(Some("alice".to_string()));
        active.update(service.db()).await.expect("update");

        push_created(&transport);
        push_token(&transport, "tok-repaired");

        let result = service.ensure_shadow_account(user_id).await;
        assert!(result.success);
        assert_eq!(result.access_token.as_deref(), Some("tok-repaired"));
    }

    #[tokio::test]
    async fn whitespace_correlation_is_reprovisioned() {
        use sea_orm::{ActiveModelTrait, IntoActiveModel, Set};

        let (service, transport, user_id) = service().await;
        let user = users::find_by_id(service.db(), user_id)
            .await
            .expect("query")
            .expect("user");
        let mut active = user.into_active_model();
        active.gitea_username = Set(Some(" ".to_string()));
        active.gitea_access_token = Set(Some(" ".to_string()));
        active.update(service.db()).await.expect("update");

        push_created(&transport);
        push_token(&transport, "tok-healed");

        let result = service.ensure_shadow_account(user_id).await;
        assert!(result.success, "{result:?}");
        assert_eq!(result.access_token.as_deref(), Some("tok-healed"));

        let again = service.ensure_shadow_account(user_id).await;
        assert_eq!(again, result);
        assert_eq!(transport.count(HttpMethod::Post, &format!("{BASE}/admin/users")), 1);
        assert_eq!(transport.count(HttpMethod::Delete, BASE), 0);
    }

    #[tokio::test]
    async fn failed_correlation_write_deletes_freshly_created_account() {
        use sea_orm::ModelTrait;

        let (service, transport, user_id) = service().await;
        let user = users::find_by_id(service.db(), user_id)
            .await
            .expect("query")
            .expect("user");
        user.clone().delete(service.db()).await.expect("delete");

        push_created(&transport);
        push_token(&transport, "tok-orphan");
        transport.push_response(
            HttpMethod::Delete,
            format!("{BASE}/admin/users/alice"),
            crate::http::HttpResponse {
                status: 204,
                headers: Vec::new(),
                body: Vec::new(),
            },
        );

        let err = service.provision(&user).await.expect_err("user row is gone");
        assert!(matches!(err, SyncError::UserNotFound(id) if id == user_id), "got {err:?}");
        assert_eq!(transport.count(HttpMethod::Delete, &format!("{BASE}/admin/users/alice")), 1);
    }

    #[tokio::test]
    async fn losing_a_provisioning_race_returns_the_stored_token() {
        let (service, _transport, user_id) = service().await;
        users::set_correlation_if_absent(service.db(), user_id, "alice", "winner")
            .await
            .expect("winner writes");

        let credential = service
            .persist_correlation(user_id, "alice", "loser")
            .await
            .expect("stored correlation is returned");
        assert_eq!(credential.access_token, "winner");
    }

    #[tokio::test]
    async fn missing_admin_credentials_fail_soft() {
        let db = test_db().await;
        let user = seed_user(&db, "alice").await;
        let (client, transport) = mock_client(crate::gitea::GiteaSettings::new("https://git.test"));
        let service = ShadowAccountService::new(db, client);

        let result = service.ensure_shadow_account(user.id).await;
        assert!(!result.success);
        assert_eq!(
            result.error_message.as_deref(),
            Some("The Git service is not configured.")
        );
        assert!(transport.requests().is_empty());
    }
}
