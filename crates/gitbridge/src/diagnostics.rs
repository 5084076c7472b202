//! Consistency audit across the platform and Gitea.
//!
//! Read-only with respect to local state. For every user with a stored
//! correlation it checks that the Gitea account still resolves, that the token
//! still authenticates, and that the token can still create repositories
//! (a private throwaway repository is created and deleted). It also reports
//! local inconsistencies and mapping anomalies. Nothing is repaired.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::Serialize;

use crate::entity::user::{Model as UserModel, ShadowCorrelation};
use crate::gitea::GiteaClient;
use crate::store::{StoreError, local_repositories, mappings, users};

/// Name prefix of throwaway repositories created by the capability check.
pub const AUDIT_REPOSITORY_PREFIX: &str = "gitbridge-audit-";

/// Per-user health.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserAudit {
    pub user_id: i32,
    pub username: String,
    pub gitea_username: String,
    pub account_exists: bool,
    pub token_valid: bool,
    pub can_create_repository: bool,
}

impl UserAudit {
    pub fn is_healthy(&self) -> bool {
        self.account_exists && self.token_valid && self.can_create_repository
    }
}

/// A user whose stored correlation has only one of username/token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InconsistentUser {
    pub user_id: i32,
    pub username: String,
    pub has_gitea_username: bool,
    pub has_access_token: bool,
}

/// A mapping whose Gitea repository no longer resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaleMapping {
    pub mapping_id: i32,
    pub local_repository_id: i32,
    pub gitea_repository_id: i64,
}

/// A local repository record with no mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnmappedLocalRepository {
    pub local_repository_id: i32,
    pub owner_id: i32,
    pub name: String,
}

/// A Gitea repository owned by a shadow account that no mapping points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnmappedRemoteRepository {
    pub user_id: i32,
    pub gitea_repository_id: i64,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub generated_at: DateTime<Utc>,
    pub service_reachable: bool,
    pub users: Vec<UserAudit>,
    pub inconsistent_users: Vec<InconsistentUser>,
    /// `false` when mappings could not be checked (no admin token).
    pub mappings_checked: bool,
    pub stale_mappings: Vec<StaleMapping>,
    pub unmapped_local_repositories: Vec<UnmappedLocalRepository>,
    pub unmapped_remote_repositories: Vec<UnmappedRemoteRepository>,
}

impl AuditReport {
    fn new() -> Self {
        Self {
            generated_at: Utc::now(),
            service_reachable: false,
            users: Vec::new(),
            inconsistent_users: Vec::new(),
            mappings_checked: false,
            stale_mappings: Vec::new(),
            unmapped_local_repositories: Vec::new(),
            unmapped_remote_repositories: Vec::new(),
        }
    }

    /// Number of findings that need attention.
    pub fn anomaly_count(&self) -> usize {
        usize::from(!self.service_reachable)
            + self.users.iter().filter(|u| !u.is_healthy()).count()
            + self.inconsistent_users.len()
            + self.stale_mappings.len()
            + self.unmapped_local_repositories.len()
            + self.unmapped_remote_repositories.len()
    }

    pub fn is_healthy(&self) -> bool {
        self.anomaly_count() == 0
    }
}

/// Runs the consistency audit.
#[derive(Debug, Clone)]
pub struct ConsistencyAuditor {
    db: Arc<DatabaseConnection>,
    client: GiteaClient,
}

impl ConsistencyAuditor {
    pub fn new(db: impl Into<Arc<DatabaseConnection>>, client: GiteaClient) -> Self {
        Self {
            db: db.into(),
            client,
        }
    }

    /// Run every check and return the findings.
    ///
    /// Never fails: checks whose inputs cannot be loaded are logged and
    /// skipped.
    #[tracing::instrument(skip(self))]
    pub async fn run(&self) -> AuditReport {
        let mut report = AuditReport::new();
        report.service_reachable = self.client.probe().await;

        let correlated = match users::find_with_correlation(&*self.db).await {
            Ok(users) => users,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load correlated users");
                Vec::new()
            }
        };

        let mapped_remote_ids = match mappings::find_all(&*self.db).await {
            Ok(all) => {
                if report.service_reachable {
                    self.check_mappings(&all, &mut report).await;
                }
                all.iter().map(|m| m.gitea_repository_id).collect::<HashSet<_>>()
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load repository mappings");
                HashSet::new()
            }
        };

        for user in &correlated {
            match user.shadow_correlation() {
                ShadowCorrelation::Complete { username, token } => {
                    if !report.service_reachable {
                        continue;
                    }
                    let audit = self.check_user(user, username, token).await;
                    if audit.token_valid {
                        self.find_unmapped_remote(user.id, token, &mapped_remote_ids, &mut report)
                            .await;
                    }
                    report.users.push(audit);
                }
                ShadowCorrelation::Partial => {
                    tracing::warn!(
                        user_id = user.id,
                        kind = "local_inconsistency",
                        "User has a partial shadow-account correlation"
                    );
                    report.inconsistent_users.push(InconsistentUser {
                        user_id: user.id,
                        username: user.username.clone(),
                        has_gitea_username: user
                            .gitea_username
                            .as_deref()
                            .is_some_and(|v| !v.trim().is_empty()),
                        has_access_token: user
                            .gitea_access_token
                            .as_deref()
                            .is_some_and(|v| !v.trim().is_empty()),
                    });
                }
                ShadowCorrelation::Absent => {}
            }
        }

        if let Err(e) = self.find_unmapped_local(&mut report).await {
            tracing::error!(error = %e, "Failed to load unmapped local repositories");
        }

        tracing::info!(
            reachable = report.service_reachable,
            users = report.users.len(),
            anomalies = report.anomaly_count(),
            "Audit finished"
        );
        report
    }

    async fn check_user(&self, user: &UserModel, gitea_username: &str, token: &str) -> UserAudit {
        let account_exists = match self.client.get_user(gitea_username).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(user_id = user.id, gitea_username, error = %e, "Gitea account does not resolve");
                false
            }
        };

        let token_valid = match self.client.current_user(token).await {
            Ok(account) if account.login.eq_ignore_ascii_case(gitea_username) => true,
            Ok(account) => {
                tracing::warn!(
                    user_id = user.id,
                    gitea_username,
                    token_owner = %account.login,
                    "Stored token belongs to a different account"
                );
                false
            }
            Err(e) => {
                tracing::warn!(user_id = user.id, gitea_username, error = %e, "Stored token does not authenticate");
                false
            }
        };

        let can_create_repository = token_valid && self.check_create_capability(user.id, gitea_username, token).await;

        UserAudit {
            user_id: user.id,
            username: user.username.clone(),
            gitea_username: gitea_username.to_string(),
            account_exists,
            token_valid,
            can_create_repository,
        }
    }

    /// Create and delete a private throwaway repository.
    async fn check_create_capability(&self, user_id: i32, owner: &str, token: &str) -> bool {
        let name = format!(
            "{}{}",
            AUDIT_REPOSITORY_PREFIX,
            &uuid::Uuid::new_v4().simple().to_string()[..12]
        );

        let repo = match self
            .client
            .create_repository(owner, token, &name, "gitbridge capability check", true)
            .await
        {
            Ok(repo) => repo,
            Err(e) => {
                tracing::warn!(user_id, owner, error = %e, "Token cannot create repositories");
                return false;
            }
        };

        if let Err(e) = self.client.delete_repository(&repo.owner, &repo.name, token).await {
            tracing::warn!(
                user_id,
                full_name = %repo.full_name,
                error = %e,
                "Failed to delete audit repository"
            );
        }
        true
    }

    async fn check_mappings(&self, all: &[crate::entity::repository_mapping::Model], report: &mut AuditReport) {
        let auth = match self.client.admin_token_auth() {
            Ok(auth) => auth,
            Err(e) => {
                tracing::error!(error = %e, "Skipping mapping check");
                return;
            }
        };
        report.mappings_checked = true;

        for mapping in all {
            match self
                .client
                .get_repository_by_id(mapping.gitea_repository_id, auth)
                .await
            {
                Ok(_) => {}
                Err(e) if e.is_not_found() => {
                    tracing::warn!(
                        mapping_id = mapping.id,
                        gitea_repository_id = mapping.gitea_repository_id,
                        "Mapped Gitea repository no longer exists"
                    );
                    report.stale_mappings.push(StaleMapping {
                        mapping_id: mapping.id,
                        local_repository_id: mapping.local_repository_id,
                        gitea_repository_id: mapping.gitea_repository_id,
                    });
                }
                Err(e) => tracing::warn!(
                    mapping_id = mapping.id,
                    error = %e,
                    "Could not check mapped repository"
                ),
            }
        }
    }

    async fn find_unmapped_remote(
        &self,
        user_id: i32,
        token: &str,
        mapped: &HashSet<i64>,
        report: &mut AuditReport,
    ) {
        let repos = match self.client.list_user_repositories(token).await {
            Ok(repos) => repos,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Could not list user repositories");
                return;
            }
        };

        report.unmapped_remote_repositories.extend(
            repos
                .into_iter()
                .filter(|r| !mapped.contains(&r.id) && !r.name.starts_with(AUDIT_REPOSITORY_PREFIX))
                .map(|r| UnmappedRemoteRepository {
                    user_id,
                    gitea_repository_id: r.id,
                    full_name: r.full_name,
                }),
        );
    }

    async fn find_unmapped_local(&self, report: &mut AuditReport) -> Result<(), StoreError> {
        report.unmapped_local_repositories = local_repositories::find_unmapped(&*self.db)
            .await?
            .into_iter()
            .map(|r| UnmappedLocalRepository {
                local_repository_id: r.id,
                owner_id: r.owner_id,
                name: r.name,
            })
            .collect();
        Ok(())
    }
}
