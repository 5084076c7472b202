use sea_orm::DatabaseConnection;

use super::{RepositoryResult, fail_soft};
use crate::descriptor::{BranchDescriptor, CommitDescriptor, ContentDescriptor, RepositoryDescriptor};
use crate::error::SyncError;
use crate::gitea::{Auth, GiteaClient};
use crate::provisioning::{ShadowAccountService, ShadowCredential};
use crate::store::{NewLocalRepository, StoreError, mappings};

/// Default number of commits returned by [`RepositorySyncService::get_commit_history`].
pub const DEFAULT_COMMIT_LIMIT: u32 = 20;

/// Orchestrates repository operations across the platform and Gitea.
#[derive(Debug, Clone)]
pub struct RepositorySyncService {
    accounts: ShadowAccountService,
}

impl RepositorySyncService {
    pub fn new(accounts: ShadowAccountService) -> Self {
        Self { accounts }
    }

    pub fn accounts(&self) -> &ShadowAccountService {
        &self.accounts
    }

    fn client(&self) -> &GiteaClient {
        self.accounts.client()
    }

    fn db(&self) -> &DatabaseConnection {
        self.accounts.db()
    }

    async fn credential(&self, user_id: i32) -> Result<ShadowCredential, SyncError> {
        self.accounts.ensure(user_id).await
    }

    // ─── Creation ────────────────────────────────────────────────────────────

    /// Create a repository for `user_id` on Gitea, then record it locally.
    ///
    /// Nothing is written locally unless the remote repository exists. The
    /// local record and its mapping are written in one transaction.
    #[tracing::instrument(skip(self, description))]
    pub async fn create_repository(
        &self,
        user_id: i32,
        name: &str,
        description: &str,
        is_private: bool,
    ) -> RepositoryResult {
        match self
            .try_create_repository(user_id, name, description, is_private)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                match &e {
                    SyncError::Store(_) => {
                        tracing::error!(user_id, name, kind = e.kind(), error = %e, "Repository creation failed")
                    }
                    _ => tracing::warn!(user_id, name, kind = e.kind(), error = %e, "Repository creation failed"),
                }
                RepositoryResult::failed(&e)
            }
        }
    }

    async fn try_create_repository(
        &self,
        user_id: i32,
        name: &str,
        description: &str,
        is_private: bool,
    ) -> Result<RepositoryResult, SyncError> {
        let credential = self.credential(user_id).await?;

        let remote = self
            .client()
            .create_repository(
                &credential.username,
                &credential.access_token,
                name,
                description,
                is_private,
            )
            .await?;

        let local = NewLocalRepository {
            owner_id: user_id,
            name: remote.name.clone(),
            description: Some(description.to_string()),
            default_branch: remote.default_branch.clone(),
            visibility: remote.visibility,
        };

        let (local, mapping) =
            mappings::insert_with_local_repository(self.db(), local, remote.id, remote.urls.clone())
                .await
                .inspect_err(|e| {
                    tracing::error!(
                        user_id,
                        gitea_repository_id = remote.id,
                        full_name = %remote.full_name,
                        error = %e,
                        "Gitea repository created but local record failed; remote repository is unmapped"
                    );
                })?;

        tracing::info!(
            user_id,
            local_repository_id = local.id,
            gitea_repository_id = remote.id,
            full_name = %remote.full_name,
            "Repository created"
        );
        Ok(RepositoryResult::created(remote, local.id, mapping.id))
    }

    // ─── Listing and search ──────────────────────────────────────────────────

    /// Repositories visible to the user's shadow account.
    #[tracing::instrument(skip(self))]
    pub async fn get_user_repositories(&self, user_id: i32) -> Vec<RepositoryDescriptor> {
        fail_soft("get_user_repositories", async {
            let credential = self.credential(user_id).await?;
            Ok::<_, SyncError>(self
                .client()
                .list_user_repositories(&credential.access_token)
                .await?)
        }
        .await)
    }

    /// Keyword search. Falls back to an anonymous search when there is no
    /// user or provisioning fails.
    #[tracing::instrument(skip(self))]
    pub async fn search_repositories(
        &self,
        keyword: &str,
        user_id: Option<i32>,
    ) -> Vec<RepositoryDescriptor> {
        let token = match user_id {
            Some(user_id) => match self.credential(user_id).await {
                Ok(credential) => Some(credential.access_token),
                Err(e) => {
                    tracing::warn!(
                        user_id,
                        kind = e.kind(),
                        error = %e,
                        "Provisioning failed; searching anonymously"
                    );
                    None
                }
            },
            None => None,
        };

        fail_soft(
            "search_repositories",
            self.client()
                .search_repositories(keyword, token.as_deref())
                .await
                .map_err(SyncError::from),
        )
    }

    // ─── Contents by owner/repo ──────────────────────────────────────────────

    #[tracing::instrument(skip(self))]
    pub async fn get_file_content(
        &self,
        user_id: i32,
        owner: &str,
        repo: &str,
        path: &str,
        branch: Option<&str>,
    ) -> Option<ContentDescriptor> {
        fail_soft("get_file_content", async {
            let credential = self.credential(user_id).await?;
            let content = self
                .client()
                .get_file_content(owner, repo, path, branch, Auth::Token(&credential.access_token))
                .await?;
            Ok::<_, SyncError>(Some(content))
        }
        .await)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_directory_content(
        &self,
        user_id: i32,
        owner: &str,
        repo: &str,
        path: Option<&str>,
        branch: Option<&str>,
    ) -> Vec<ContentDescriptor> {
        fail_soft("get_directory_content", async {
            let credential = self.credential(user_id).await?;
            Ok::<_, SyncError>(self
                .client()
                .list_directory(owner, repo, path, branch, Auth::Token(&credential.access_token))
                .await?)
        }
        .await)
    }

    // ─── Contents by Gitea repository ID ─────────────────────────────────────

    /// Fetch a file from a mapped repository using the administrative token.
    #[tracing::instrument(skip(self))]
    pub async fn get_repository_file_content(
        &self,
        gitea_repository_id: i64,
        path: &str,
        branch: Option<&str>,
    ) -> Option<ContentDescriptor> {
        fail_soft("get_repository_file_content", async {
            let auth = self.client().admin_token_auth()?;
            let repo = self.resolve_remote(gitea_repository_id, auth).await?;
            let content = self
                .client()
                .get_file_content(&repo.owner, &repo.name, path, branch, auth)
                .await?;
            Ok::<_, SyncError>(Some(content))
        }
        .await)
    }

    /// List a directory of a mapped repository using the administrative
    /// token. `None` lists the root.
    #[tracing::instrument(skip(self))]
    pub async fn get_directory_contents(
        &self,
        gitea_repository_id: i64,
        branch: Option<&str>,
        path: Option<&str>,
    ) -> Vec<ContentDescriptor> {
        fail_soft("get_directory_contents", async {
            let auth = self.client().admin_token_auth()?;
            let repo = self.resolve_remote(gitea_repository_id, auth).await?;
            Ok::<_, SyncError>(self
                .client()
                .list_directory(&repo.owner, &repo.name, path, branch, auth)
                .await?)
        }
        .await)
    }

    /// Descriptor of the Gitea repository mapped to a local repository.
    #[tracing::instrument(skip(self))]
    pub async fn get_repository_by_local_id(
        &self,
        local_repository_id: i32,
    ) -> Option<RepositoryDescriptor> {
        fail_soft("get_repository_by_local_id", async {
            let mapping = mappings::find_by_local_id(self.db(), local_repository_id)
                .await?
                .ok_or_else(|| {
                    SyncError::NotFound(format!(
                        "no mapping for local repository {}",
                        local_repository_id
                    ))
                })?;
            let auth = self.client().admin_token_auth()?;
            let repo = self.resolve_remote(mapping.gitea_repository_id, auth).await?;
            Ok::<_, SyncError>(Some(repo))
        }
        .await)
    }

    /// Look up a repository by Gitea ID and refresh its mapping's sync date.
    async fn resolve_remote(
        &self,
        gitea_repository_id: i64,
        auth: Auth<'_>,
    ) -> Result<RepositoryDescriptor, SyncError> {
        let repo = self
            .client()
            .get_repository_by_id(gitea_repository_id, auth)
            .await?;
        self.touch_mapping(gitea_repository_id).await;
        Ok(repo)
    }

    async fn touch_mapping(&self, gitea_repository_id: i64) {
        match self.touch_mapping_inner(gitea_repository_id).await {
            Ok(true) => {}
            Ok(false) => tracing::debug!(gitea_repository_id, "No mapping to refresh"),
            Err(e) => tracing::error!(gitea_repository_id, error = %e, "Failed to refresh mapping sync date"),
        }
    }

    async fn touch_mapping_inner(&self, gitea_repository_id: i64) -> Result<bool, StoreError> {
        match mappings::find_by_remote_id(self.db(), gitea_repository_id).await? {
            Some(mapping) => mappings::touch_last_sync(self.db(), mapping.id).await,
            None => Ok(false),
        }
    }

    // ─── Branches and commits ────────────────────────────────────────────────

    #[tracing::instrument(skip(self))]
    pub async fn get_branches(&self, user_id: i32, owner: &str, repo: &str) -> Vec<BranchDescriptor> {
        fail_soft("get_branches", async {
            let credential = self.credential(user_id).await?;
            Ok::<_, SyncError>(self
                .client()
                .list_branches(owner, repo, &credential.access_token)
                .await?)
        }
        .await)
    }

    /// Most recent commits, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn get_commit_history(
        &self,
        user_id: i32,
        owner: &str,
        repo: &str,
        branch: Option<&str>,
        limit: u32,
    ) -> Vec<CommitDescriptor> {
        fail_soft("get_commit_history", async {
            let credential = self.credential(user_id).await?;
            Ok::<_, SyncError>(self
                .client()
                .list_commits(owner, repo, branch, limit, &credential.access_token)
                .await?)
        }
        .await)
    }

    /// Create `new_name` from the head of `source`. Returns `false` if the
    /// source branch does not resolve or creation fails.
    #[tracing::instrument(skip(self))]
    pub async fn create_branch(
        &self,
        user_id: i32,
        owner: &str,
        repo: &str,
        new_name: &str,
        source: &str,
    ) -> bool {
        fail_soft("create_branch", async {
            let credential = self.credential(user_id).await?;
            self.client()
                .create_branch(owner, repo, new_name, source, &credential.access_token)
                .await?;
            tracing::info!(user_id, owner, repo, branch = new_name, source, "Branch created");
            Ok::<_, SyncError>(true)
        }
        .await)
    }
}
