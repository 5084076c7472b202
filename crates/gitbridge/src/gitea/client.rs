//! Gitea API client.
//!
//! Thin wrapper over the REST API: builds authenticated requests, encodes and
//! decodes JSON, and classifies HTTP outcomes. It holds no business logic.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::convert::{
    derive_urls, to_branch_descriptor, to_commit_descriptor, to_content_descriptor,
    to_repository_descriptor,
};
use super::error::GiteaError;
use super::settings::GiteaSettings;
use super::types::{
    CreateAccessTokenOption, CreateBranchRepoOption, CreateRepoOption, CreateUserOption,
    GiteaAccessToken, GiteaBranch, GiteaCommit, GiteaContentsResponse, GiteaRepo,
    GiteaSearchResults, GiteaServerVersion, GiteaUser,
};
use crate::descriptor::{BranchDescriptor, CommitDescriptor, ContentDescriptor, RepositoryDescriptor};
use crate::http::reqwest_transport::ReqwestTransport;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};

/// Upper bound for the connectivity probe.
pub const PROBE_TIMEOUT: StdDuration = StdDuration::from_secs(5);

/// Minimum password length accepted before calling the admin endpoint.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Scopes requested for shadow-account tokens.
pub const TOKEN_SCOPES: &[&str] = &["write:repository", "write:user"];

/// Default page size for API requests.
const PAGE_SIZE: u32 = 50;

/// Hard stop for paginated listings.
const MAX_PAGES: u32 = 200;

/// How a request authenticates.
#[derive(Debug, Clone, Copy)]
pub enum Auth<'a> {
    /// `Authorization: token <value>`.
    Token(&'a str),
    /// `Authorization: Basic <base64(user:pass)>`. Only used to mint tokens.
    Basic {
        username: &'a str,
        password: &'a str,
    },
    Anonymous,
}

impl Auth<'_> {
    fn header_value(&self) -> Option<String> {
        match self {
            Auth::Token(token) => Some(format!("token {}", token)),
            Auth::Basic { username, password } => {
                use base64::Engine;
                let raw = format!("{}:{}", username, password);
                Some(format!(
                    "Basic {}",
                    base64::engine::general_purpose::STANDARD.encode(raw)
                ))
            }
            Auth::Anonymous => None,
        }
    }
}

/// Outcome of an account-creation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCreation {
    /// The account was created by this call.
    Created,
    /// The remote reported a conflict: the account already exists.
    AlreadyExists,
}

/// Gitea API client.
///
/// Cheap to clone; clones share the connection pool and settings.
#[derive(Clone)]
pub struct GiteaClient {
    transport: Arc<dyn HttpTransport>,
    settings: Arc<GiteaSettings>,
}

impl std::fmt::Debug for GiteaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GiteaClient")
            .field("base_url", &self.settings.normalized_base_url())
            .finish_non_exhaustive()
    }
}

impl GiteaClient {
    /// Create a client backed by reqwest.
    ///
    /// Missing administrative credentials are logged, not rejected: the
    /// client can still serve per-user token operations.
    pub fn new(settings: GiteaSettings) -> Result<Self, GiteaError> {
        let transport =
            ReqwestTransport::with_timeout(StdDuration::from_secs(settings.request_timeout_secs))
                .map_err(|e| GiteaError::NotConfigured(e.to_string()))?;
        Ok(Self::new_with_transport(settings, Arc::new(transport)))
    }

    pub fn new_with_transport(settings: GiteaSettings, transport: Arc<dyn HttpTransport>) -> Self {
        for missing in settings.missing_admin_settings() {
            tracing::warn!(
                setting = missing,
                "Gitea administrative setting is not configured"
            );
        }
        Self {
            transport,
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &GiteaSettings {
        &self.settings
    }

    pub fn base_url(&self) -> &str {
        self.settings.normalized_base_url()
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url(), path)
    }

    /// Auth for account administration: the admin token, else admin basic
    /// credentials. ID-based lookups use [`admin_token_auth`](Self::admin_token_auth).
    fn admin_auth(&self) -> Result<Auth<'_>, GiteaError> {
        if let Some(token) = self.settings.admin_token() {
            return Ok(Auth::Token(token));
        }
        match self.settings.admin_credentials() {
            Some((username, password)) => Ok(Auth::Basic { username, password }),
            None => Err(GiteaError::NotConfigured(
                "admin_token or admin_username/admin_password".to_string(),
            )),
        }
    }

    /// Auth for ID-based lookups, which require the administrative token.
    pub fn admin_token_auth(&self) -> Result<Auth<'_>, GiteaError> {
        self.settings
            .admin_token()
            .map(Auth::Token)
            .ok_or_else(|| GiteaError::NotConfigured("admin_token".to_string()))
    }

    async fn execute(
        &self,
        method: HttpMethod,
        path: &str,
        auth: Auth<'_>,
        body: Option<Vec<u8>>,
    ) -> Result<HttpResponse, GiteaError> {
        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
        if let Some(value) = auth.header_value() {
            headers.push(("Authorization".to_string(), value));
        }
        if body.is_some() {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }

        let request = HttpRequest {
            method,
            url: self.api_url(path),
            headers,
            body: body.unwrap_or_default(),
        };

        tracing::debug!(method = method.as_str(), path, "Gitea request");

        let response = self.transport.send(request).await.map_err(|e| {
            tracing::warn!(method = method.as_str(), path, error = %e, "Gitea unreachable");
            GiteaError::from(e)
        })?;

        if !response.is_success() {
            let message = response.body_text();
            tracing::warn!(
                method = method.as_str(),
                path,
                status = response.status,
                body = %message,
                "Gitea request failed"
            );
            return Err(GiteaError::Api {
                status: response.status,
                message,
            });
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        auth: Auth<'_>,
    ) -> Result<T, GiteaError> {
        let response = self.execute(HttpMethod::Get, path, auth, None).await?;
        decode(path, &response)
    }

    async fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        auth: Auth<'_>,
        body: &B,
    ) -> Result<T, GiteaError> {
        let payload = serde_json::to_vec(body)?;
        let response = self.execute(method, path, auth, Some(payload)).await?;
        decode(path, &response)
    }

    /// Fetch every page of a listing endpoint.
    async fn get_paginated<T: DeserializeOwned>(
        &self,
        path: &str,
        auth: Auth<'_>,
    ) -> Result<Vec<T>, GiteaError> {
        let separator = if path.contains('?') { '&' } else { '?' };
        let mut all = Vec::new();

        for page in 1..=MAX_PAGES {
            let items: Vec<T> = self
                .get_json(
                    &format!("{}{}page={}&limit={}", path, separator, page, PAGE_SIZE),
                    auth,
                )
                .await?;

            let count = items.len();
            all.extend(items);

            // If we got fewer than PAGE_SIZE, we've reached the end
            if count < PAGE_SIZE as usize {
                break;
            }
        }

        Ok(all)
    }

    // ─── Connectivity ────────────────────────────────────────────────────────

    /// Check that the service answers its version endpoint within
    /// [`PROBE_TIMEOUT`]. Never fails; problems are logged.
    pub async fn probe(&self) -> bool {
        match tokio::time::timeout(PROBE_TIMEOUT, self.server_version()).await {
            Ok(Ok(version)) => {
                tracing::info!(version = %version, base_url = self.base_url(), "Gitea reachable");
                true
            }
            Ok(Err(e)) => {
                tracing::warn!(base_url = self.base_url(), error = %e, "Gitea probe failed");
                false
            }
            Err(_) => {
                tracing::warn!(
                    base_url = self.base_url(),
                    timeout_secs = PROBE_TIMEOUT.as_secs(),
                    "Gitea probe timed out"
                );
                false
            }
        }
    }

    pub async fn server_version(&self) -> Result<String, GiteaError> {
        let version: GiteaServerVersion = self.get_json("/version", Auth::Anonymous).await?;
        Ok(version.version)
    }

    // ─── Accounts ────────────────────────────────────────────────────────────

    /// Mint an API token for `username` using basic auth.
    pub async fn issue_token(
        &self,
        username: &str,
        password: &str,
        token_label: &str,
    ) -> Result<String, GiteaError> {
        let body = CreateAccessTokenOption {
            name: token_label,
            scopes: TOKEN_SCOPES,
        };
        let token: GiteaAccessToken = self
            .send_json(
                HttpMethod::Post,
                &format!("/users/{}/tokens", segment(username)),
                Auth::Basic { username, password },
                &body,
            )
            .await?;

        if token.sha1.trim().is_empty() {
            tracing::warn!(username, "Gitea returned an empty token");
            return Err(GiteaError::Api {
                status: 201,
                message: "empty token in response".to_string(),
            });
        }
        Ok(token.sha1)
    }

    /// Create an account through the admin API.
    ///
    /// A 409 counts as success. If the first attempt fails for any other
    /// reason it is retried once with `{lowercased username}@{sync_domain}`,
    /// since some instances reject the original address.
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<UserCreation, GiteaError> {
        validate_new_user(username, email, password)?;
        let auth = self.admin_auth()?;

        let first = self
            .post_user(auth, username, email, password, display_name)
            .await;
        let first_err = match first {
            Ok(outcome) => return Ok(outcome),
            Err(e) => e,
        };

        let fallback = fallback_email(username, &self.settings.sync_domain);
        if fallback == email {
            return Err(first_err);
        }

        tracing::info!(
            username,
            fallback_email = %fallback,
            "Retrying account creation with fallback address"
        );
        self.post_user(auth, username, &fallback, password, display_name)
            .await
    }

    async fn post_user(
        &self,
        auth: Auth<'_>,
        username: &str,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<UserCreation, GiteaError> {
        let body = CreateUserOption {
            username,
            email,
            password,
            full_name: display_name,
            must_change_password: false,
            send_notify: false,
        };
        let payload = serde_json::to_vec(&body)?;
        match self
            .execute(HttpMethod::Post, "/admin/users", auth, Some(payload))
            .await
        {
            Ok(_) => Ok(UserCreation::Created),
            Err(e) if e.is_conflict() => {
                tracing::info!(username, "Gitea account already exists");
                Ok(UserCreation::AlreadyExists)
            }
            Err(e) => Err(e),
        }
    }

    /// Delete an account through the admin API.
    pub async fn delete_user(&self, username: &str) -> Result<(), GiteaError> {
        let auth = self.admin_auth()?;
        self.execute(
            HttpMethod::Delete,
            &format!("/admin/users/{}", segment(username)),
            auth,
            None,
        )
        .await?;
        Ok(())
    }

    /// Look up an account by name. Uses admin auth when configured.
    pub async fn get_user(&self, username: &str) -> Result<GiteaUser, GiteaError> {
        let auth = self.admin_auth().unwrap_or(Auth::Anonymous);
        self.get_json(&format!("/users/{}", segment(username)), auth)
            .await
    }

    /// The account a token belongs to.
    pub async fn current_user(&self, token: &str) -> Result<GiteaUser, GiteaError> {
        self.get_json("/user", Auth::Token(token)).await
    }

    // ─── Repositories ────────────────────────────────────────────────────────

    /// Create a repository owned by the token's account.
    ///
    /// The repository is auto-initialized so it never starts empty. Access
    /// URLs are derived from the configured base URL and `owner`.
    pub async fn create_repository(
        &self,
        owner: &str,
        token: &str,
        name: &str,
        description: &str,
        private: bool,
    ) -> Result<RepositoryDescriptor, GiteaError> {
        if name.trim().is_empty() {
            return Err(GiteaError::Validation(
                "repository name is required".to_string(),
            ));
        }

        let body = CreateRepoOption {
            name,
            description,
            private,
            auto_init: true,
            default_branch: &self.settings.default_branch,
            readme: "Default",
        };
        let repo: GiteaRepo = self
            .send_json(HttpMethod::Post, "/user/repos", Auth::Token(token), &body)
            .await?;

        let mut descriptor = to_repository_descriptor(&repo, &self.settings);
        if descriptor.owner != owner {
            tracing::debug!(
                requested_owner = owner,
                remote_owner = %descriptor.owner,
                "Repository created under a different owner login"
            );
        }
        descriptor.urls = derive_urls(&self.settings, owner, &descriptor.name);
        Ok(descriptor)
    }

    pub async fn delete_repository(
        &self,
        owner: &str,
        repo: &str,
        token: &str,
    ) -> Result<(), GiteaError> {
        self.execute(
            HttpMethod::Delete,
            &repo_path(owner, repo, ""),
            Auth::Token(token),
            None,
        )
        .await?;
        Ok(())
    }

    pub async fn get_repository_by_id(
        &self,
        id: i64,
        auth: Auth<'_>,
    ) -> Result<RepositoryDescriptor, GiteaError> {
        let repo: GiteaRepo = self.get_json(&format!("/repositories/{}", id), auth).await?;
        Ok(to_repository_descriptor(&repo, &self.settings))
    }

    /// Repositories the token's account owns or can access.
    pub async fn list_user_repositories(
        &self,
        token: &str,
    ) -> Result<Vec<RepositoryDescriptor>, GiteaError> {
        let repos: Vec<GiteaRepo> = self
            .get_paginated("/user/repos", Auth::Token(token))
            .await?;
        Ok(repos
            .iter()
            .map(|r| to_repository_descriptor(r, &self.settings))
            .collect())
    }

    /// Keyword search. Without a token only public repositories are visible.
    pub async fn search_repositories(
        &self,
        keyword: &str,
        token: Option<&str>,
    ) -> Result<Vec<RepositoryDescriptor>, GiteaError> {
        let auth = token.map(Auth::Token).unwrap_or(Auth::Anonymous);
        let results: GiteaSearchResults = self
            .get_json(
                &format!(
                    "/repos/search?q={}&limit={}",
                    urlencoding::encode(keyword),
                    PAGE_SIZE
                ),
                auth,
            )
            .await?;

        if !results.ok {
            tracing::warn!(keyword, "Gitea search reported ok=false");
        }
        Ok(results
            .data
            .iter()
            .map(|r| to_repository_descriptor(r, &self.settings))
            .collect())
    }

    // ─── Contents ────────────────────────────────────────────────────────────

    /// Fetch a single file, with its body.
    pub async fn get_file_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: Option<&str>,
        auth: Auth<'_>,
    ) -> Result<ContentDescriptor, GiteaError> {
        let path = path.trim_matches('/');
        if path.is_empty() {
            return Err(GiteaError::Validation("file path is required".to_string()));
        }

        let response: GiteaContentsResponse = self
            .get_json(&contents_path(owner, repo, path, git_ref), auth)
            .await?;
        match response {
            GiteaContentsResponse::Single(entry) => Ok(to_content_descriptor(*entry)),
            GiteaContentsResponse::Listing(_) => Err(GiteaError::Validation(format!(
                "{} is a directory",
                path
            ))),
        }
    }

    /// List a directory. `None` or an empty path lists the repository root.
    pub async fn list_directory(
        &self,
        owner: &str,
        repo: &str,
        path: Option<&str>,
        git_ref: Option<&str>,
        auth: Auth<'_>,
    ) -> Result<Vec<ContentDescriptor>, GiteaError> {
        let path = path.unwrap_or_default().trim_matches('/');
        let response: GiteaContentsResponse = self
            .get_json(&contents_path(owner, repo, path, git_ref), auth)
            .await?;
        Ok(response
            .into_entries()
            .into_iter()
            .map(to_content_descriptor)
            .collect())
    }

    // ─── Branches and commits ────────────────────────────────────────────────

    pub async fn list_branches(
        &self,
        owner: &str,
        repo: &str,
        token: &str,
    ) -> Result<Vec<BranchDescriptor>, GiteaError> {
        let branches: Vec<GiteaBranch> = self
            .get_paginated(&repo_path(owner, repo, "/branches"), Auth::Token(token))
            .await?;
        Ok(branches.iter().map(to_branch_descriptor).collect())
    }

    pub async fn get_branch(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
        token: &str,
    ) -> Result<BranchDescriptor, GiteaError> {
        let branch: GiteaBranch = self
            .get_json(
                &repo_path(owner, repo, &format!("/branches/{}", segment(name))),
                Auth::Token(token),
            )
            .await?;
        Ok(to_branch_descriptor(&branch))
    }

    /// Most recent commits, newest first, optionally starting at `branch`.
    pub async fn list_commits(
        &self,
        owner: &str,
        repo: &str,
        branch: Option<&str>,
        limit: u32,
        token: &str,
    ) -> Result<Vec<CommitDescriptor>, GiteaError> {
        let mut path = repo_path(owner, repo, "/commits?");
        if let Some(branch) = branch.filter(|b| !b.is_empty()) {
            path.push_str(&format!("sha={}&", urlencoding::encode(branch)));
        }
        path.push_str(&format!("limit={}&page=1", limit.clamp(1, PAGE_SIZE)));

        let commits: Vec<GiteaCommit> = self.get_json(&path, Auth::Token(token)).await?;
        Ok(commits.iter().map(to_commit_descriptor).collect())
    }

    /// Create `new_name` from the head of `source`.
    ///
    /// The source branch is resolved first; if that fails no creation request
    /// is sent.
    pub async fn create_branch(
        &self,
        owner: &str,
        repo: &str,
        new_name: &str,
        source: &str,
        token: &str,
    ) -> Result<BranchDescriptor, GiteaError> {
        if new_name.trim().is_empty() {
            return Err(GiteaError::Validation("branch name is required".to_string()));
        }

        let head = self.get_branch(owner, repo, source, token).await?;
        let body = CreateBranchRepoOption {
            new_branch_name: new_name,
            old_ref_name: &head.head_sha,
        };
        let branch: GiteaBranch = self
            .send_json(
                HttpMethod::Post,
                &repo_path(owner, repo, "/branches"),
                Auth::Token(token),
                &body,
            )
            .await?;
        Ok(to_branch_descriptor(&branch))
    }
}

fn decode<T: DeserializeOwned>(path: &str, response: &HttpResponse) -> Result<T, GiteaError> {
    serde_json::from_slice(&response.body).map_err(|e| {
        tracing::warn!(
            path,
            status = response.status,
            body = %response.body_text(),
            error = %e,
            "Unexpected Gitea response body"
        );
        GiteaError::Json(e)
    })
}

fn validate_new_user(username: &str, email: &str, password: &str) -> Result<(), GiteaError> {
    if username.trim().is_empty() {
        return Err(GiteaError::Validation("username is required".to_string()));
    }
    if email.trim().is_empty() {
        return Err(GiteaError::Validation("email is required".to_string()));
    }
    if password.is_empty() {
        return Err(GiteaError::Validation("password is required".to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(GiteaError::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// `{lowercased username}@{sync_domain}`.
pub fn fallback_email(username: &str, sync_domain: &str) -> String {
    format!("{}@{}", username.to_lowercase(), sync_domain)
}

fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

fn repo_path(owner: &str, repo: &str, suffix: &str) -> String {
    format!("/repos/{}/{}{}", segment(owner), segment(repo), suffix)
}

fn contents_path(owner: &str, repo: &str, path: &str, git_ref: Option<&str>) -> String {
    let mut out = repo_path(owner, repo, "/contents");
    if !path.is_empty() {
        let encoded: Vec<String> = path.split('/').map(segment).collect();
        out.push('/');
        out.push_str(&encoded.join("/"));
    }
    if let Some(git_ref) = git_ref.filter(|r| !r.is_empty()) {
        out.push_str(&format!("?ref={}", urlencoding::encode(git_ref)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::MockTransport;
    use serde_json::json;

    const BASE: &str = "https://git.test/api/v1";

    fn settings() -> GiteaSettings {
        GiteaSettings {
            base_url: "https://git.test/".to_string(),
            admin_username: Some("root".to_string()),
            admin_password: Some("rootpass".to_string()),
            admin_token: Some("admin-token".to_string()),
            sync_domain: "sync.test".to_string(),
            ..GiteaSettings::default()
        }
    }

    fn client_with(settings: GiteaSettings) -> (GiteaClient, MockTransport) {
        let transport = MockTransport::new();
        let client = GiteaClient::new_with_transport(settings, Arc::new(transport.clone()));
        (client, transport)
    }

    fn client() -> (GiteaClient, MockTransport) {
        client_with(settings())
    }

    fn repo_json(id: i64, owner: &str, name: &str) -> serde_json::Value {
        json!({
            "id": id,
            "name": name,
            "full_name": format!("{owner}/{name}"),
            "private": false,
            "owner": {"id": 1, "login": owner},
            "default_branch": "main",
            "size": 12,
            "stars_count": 3,
            "watchers_count": 1
        })
    }

    fn body_json(request: &HttpRequest) -> serde_json::Value {
        serde_json::from_slice(&request.body).expect("request body is json")
    }

    #[test]
    fn debug_does_not_leak_credentials() {
        let (client, _) = client();
        let debug = format!("{:?}", client);
        assert!(debug.contains("https://git.test"));
        assert!(!debug.contains("admin-token"));
        assert!(!debug.contains("rootpass"));
    }

    #[test]
    fn contents_path_encodes_segments_and_ref() {
        assert_eq!(
            contents_path("alice", "demo", "docs/read me.md", Some("feature/x")),
            "/repos/alice/demo/contents/docs/read%20me.md?ref=feature%2Fx"
        );
        assert_eq!(
            contents_path("alice", "demo", "", None),
            "/repos/alice/demo/contents"
        );
    }

    #[test]
    fn fallback_email_lowercases() {
        assert_eq!(fallback_email("Alice_B", "sync.test"), "alice_b@sync.test");
    }

    #[tokio::test]
    async fn probe_reports_reachability() {
        let (client, transport) = client();
        transport.push_json(HttpMethod::Get, format!("{BASE}/version"), 200, json!({"version": "1.22.0"}));
        assert!(client.probe().await);

        transport.push_json(HttpMethod::Get, format!("{BASE}/version"), 502, json!({}));
        assert!(!client.probe().await);

        transport.push_unreachable(HttpMethod::Get, format!("{BASE}/version"));
        assert!(!client.probe().await);

        let requests = transport.requests();
        assert!(requests.iter().all(|r| r.header("authorization").is_none()));
    }

    struct StalledTransport;

    #[async_trait::async_trait]
    impl HttpTransport for StalledTransport {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, crate::http::HttpError> {
            tokio::time::sleep(StdDuration::from_secs(60)).await;
            Ok(HttpResponse {
                status: 200,
                headers: Vec::new(),
                body: br#"{"version":"late"}"#.to_vec(),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn probe_gives_up_after_timeout() {
        let client = GiteaClient::new_with_transport(settings(), Arc::new(StalledTransport));
        let started = tokio::time::Instant::now();
        assert!(!client.probe().await);
        assert!(started.elapsed() <= PROBE_TIMEOUT + StdDuration::from_millis(10));
    }

    #[tokio::test]
    async fn issue_token_uses_basic_auth_and_scopes() {
        let (client, transport) = client();
        transport.push_json(
            HttpMethod::Post,
            format!("{BASE}/users/alice/tokens"),
            201,
            json!({"id": 5, "name": "gitbridge", "sha1": "tok-123"}),
        );

        let token = client
            .issue_token("alice", "s3cret!", "gitbridge")
            .await
            .expect("token should be minted");
        assert_eq!(token, "tok-123");

        let request = &transport.requests()[0];
        // base64("alice:s3cret!")
        assert_eq!(request.header("authorization"), Some("Basic YWxpY2U6czNjcmV0IQ=="));
        let body = body_json(request);
        assert_eq!(body["name"], "gitbridge");
        assert_eq!(body["scopes"], json!(["write:repository", "write:user"]));
    }

    #[tokio::test]
    async fn issue_token_rejection_is_an_error() {
        let (client, transport) = client();
        transport.push_json(
            HttpMethod::Post,
            format!("{BASE}/users/alice/tokens"),
            401,
            json!({"message": "user's password is invalid"}),
        );

        let err = client
            .issue_token("alice", "wrong-password", "gitbridge")
            .await
            .expect_err("401 should fail");
        assert_eq!(err.status(), Some(401));
    }

    #[tokio::test]
    async fn issue_token_with_garbage_body_is_a_json_error() {
        let (client, transport) = client();
        transport.push_response(
            HttpMethod::Post,
            format!("{BASE}/users/alice/tokens"),
            HttpResponse {
                status: 201,
                headers: Vec::new(),
                body: b"<html>proxy</html>".to_vec(),
            },
        );

        let err = client
            .issue_token("alice", "password", "gitbridge")
            .await
            .expect_err("garbage should fail");
        assert!(matches!(err, GiteaError::Json(_)));
    }

    #[tokio::test]
    async fn create_user_validates_before_calling_remote() {
        let (client, transport) = client();

        for (username, email, password) in [
            ("", "a@example.com", "password"),
            ("alice", " ", "password"),
            ("alice", "a@example.com", ""),
            ("alice", "a@example.com", "12345"),
        ] {
            let err = client
                .create_user(username, email, password, "Alice")
                .await
                .expect_err("invalid input should fail");
            assert!(matches!(err, GiteaError::Validation(_)));
        }
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn create_user_treats_conflict_as_success() {
        let (client, transport) = client();
        transport.push_json(
            HttpMethod::Post,
            format!("{BASE}/admin/users"),
            409,
            json!({"message": "user already exists"}),
        );

        let outcome = client
            .create_user("alice", "alice@example.com", "password123", "Alice")
            .await
            .expect("conflict is success");
        assert_eq!(outcome, UserCreation::AlreadyExists);
        assert_eq!(transport.count(HttpMethod::Post, &format!("{BASE}/admin/users")), 1);
    }

    #[tokio::test]
    async fn create_user_retries_with_fallback_email() {
        let (client, transport) = client();
        let url = format!("{BASE}/admin/users");
        transport.push_json(HttpMethod::Post, url.clone(), 422, json!({"message": "email not allowed"}));
        transport.push_json(HttpMethod::Post, url.clone(), 201, json!({"id": 9, "login": "Alice"}));

        let outcome = client
            .create_user("Alice", "alice@blocked.example", "password123", "Alice")
            .await
            .expect("fallback should succeed");
        assert_eq!(outcome, UserCreation::Created);

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(body_json(&requests[0])["email"], "alice@blocked.example");
        assert_eq!(body_json(&requests[1])["email"], "alice@sync.test");
        assert_eq!(requests[0].header("authorization"), Some("token admin-token"));
    }

    #[tokio::test]
    async fn create_user_reports_second_failure() {
        let (client, transport) = client();
        let url = format!("{BASE}/admin/users");
        transport.push_json(HttpMethod::Post, url.clone(), 422, json!({}));
        transport.push_json(HttpMethod::Post, url.clone(), 500, json!({}));

        let err = client
            .create_user("alice", "alice@example.com", "password123", "Alice")
            .await
            .expect_err("both attempts fail");
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn create_user_without_admin_credentials_is_not_configured() {
        let (client, transport) = client_with(GiteaSettings::new("https://git.test"));
        let err = client
            .create_user("alice", "alice@example.com", "password123", "Alice")
            .await
            .expect_err("no admin credentials");
        assert!(matches!(err, GiteaError::NotConfigured(_)));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn admin_basic_credentials_are_used_without_token() {
        let (client, transport) = client_with(GiteaSettings {
            admin_token: None,
            ..settings()
        });
        transport.push_json(HttpMethod::Post, format!("{BASE}/admin/users"), 201, json!({}));

        client
            .create_user("alice", "alice@example.com", "password123", "Alice")
            .await
            .expect("created");
        let auth = transport.requests()[0]
            .header("authorization")
            .map(str::to_string)
            .expect("auth header");
        assert!(auth.starts_with("Basic "));
    }

    #[tokio::test]
    async fn create_repository_auto_inits_and_derives_urls() {
        let (client, transport) = client();
        transport.push_json(
            HttpMethod::Post,
            format!("{BASE}/user/repos"),
            201,
            json!({"id": 77, "name": "demo", "owner": {"id": 4, "login": "alice"}}),
        );

        let repo = client
            .create_repository("alice", "user-token", "demo", "A demo", false)
            .await
            .expect("repository created");
        assert_eq!(repo.id, 77);
        assert_eq!(repo.urls.html_url, "https://git.test/alice/demo");
        assert_eq!(repo.urls.clone_url, "https://git.test/alice/demo.git");
        assert_eq!(repo.urls.ssh_url, "git@git.test:alice/demo.git");

        let request = &transport.requests()[0];
        assert_eq!(request.header("authorization"), Some("token user-token"));
        let body = body_json(request);
        assert_eq!(body["auto_init"], true);
        assert_eq!(body["private"], false);
        assert_eq!(body["default_branch"], "main");
    }

    #[tokio::test]
    async fn list_user_repositories_paginates() {
        let (client, transport) = client();
        let page1: Vec<_> = (1..=50).map(|i| repo_json(i, "alice", &format!("r{i}"))).collect();
        transport.push_json(
            HttpMethod::Get,
            format!("{BASE}/user/repos?page=1&limit=50"),
            200,
            json!(page1),
        );
        transport.push_json(
            HttpMethod::Get,
            format!("{BASE}/user/repos?page=2&limit=50"),
            200,
            json!([repo_json(51, "alice", "r51")]),
        );

        let repos = client
            .list_user_repositories("user-token")
            .await
            .expect("listing");
        assert_eq!(repos.len(), 51);
        assert_eq!(repos[50].urls.html_url, "https://git.test/alice/r51");
    }

    #[tokio::test]
    async fn search_without_token_is_anonymous() {
        let (client, transport) = client();
        transport.push_json(
            HttpMethod::Get,
            format!("{BASE}/repos/search?q=hello%20world&limit=50"),
            200,
            json!({"ok": true, "data": [repo_json(3, "bob", "hello")]}),
        );

        let repos = client
            .search_repositories("hello world", None)
            .await
            .expect("search");
        assert_eq!(repos.len(), 1);
        assert!(transport.requests()[0].header("authorization").is_none());
    }

    #[tokio::test]
    async fn file_content_and_directory_listing() {
        let (client, transport) = client();
        transport.push_json(
            HttpMethod::Get,
            format!("{BASE}/repos/alice/demo/contents/README.md?ref=main"),
            200,
            json!({"name": "README.md", "path": "README.md", "type": "file", "size": 5,
                   "encoding": "base64", "content": "aGVsbG8="}),
        );
        transport.push_json(
            HttpMethod::Get,
            format!("{BASE}/repos/alice/demo/contents"),
            200,
            json!([{"name": "README.md", "path": "README.md", "type": "file"},
                   {"name": "src", "path": "src", "type": "dir"}]),
        );

        let file = client
            .get_file_content("alice", "demo", "/README.md", Some("main"), Auth::Token("t"))
            .await
            .expect("file");
        assert_eq!(file.text().as_deref(), Some("hello"));

        let listing = client
            .list_directory("alice", "demo", None, None, Auth::Token("t"))
            .await
            .expect("listing");
        assert_eq!(listing.len(), 2);
        assert!(listing[1].is_dir());
    }

    #[tokio::test]
    async fn file_content_on_directory_is_rejected() {
        let (client, transport) = client();
        transport.push_json(
            HttpMethod::Get,
            format!("{BASE}/repos/alice/demo/contents/src"),
            200,
            json!([{"name": "lib.rs", "path": "src/lib.rs", "type": "file"}]),
        );

        let err = client
            .get_file_content("alice", "demo", "src", None, Auth::Token("t"))
            .await
            .expect_err("directory is not a file");
        assert!(matches!(err, GiteaError::Validation(_)));
    }

    #[tokio::test]
    async fn create_branch_resolves_source_head_first() {
        let (client, transport) = client();
        transport.push_json(
            HttpMethod::Get,
            format!("{BASE}/repos/alice/demo/branches/main"),
            200,
            json!({"name": "main", "commit": {"id": "abc123", "message": "init"}}),
        );
        transport.push_json(
            HttpMethod::Post,
            format!("{BASE}/repos/alice/demo/branches"),
            201,
            json!({"name": "feature", "commit": {"id": "abc123", "message": "init"}}),
        );

        let branch = client
            .create_branch("alice", "demo", "feature", "main", "t")
            .await
            .expect("branch created");
        assert_eq!(branch.name, "feature");
        assert_eq!(branch.head_sha, "abc123");

        let post = &transport.requests()[1];
        let body = body_json(post);
        assert_eq!(body["new_branch_name"], "feature");
        assert_eq!(body["old_ref_name"], "abc123");
    }

    #[tokio::test]
    async fn create_branch_with_missing_source_sends_no_post() {
        let (client, transport) = client();
        transport.push_json(
            HttpMethod::Get,
            format!("{BASE}/repos/alice/demo/branches/nope"),
            404,
            json!({"message": "branch not found"}),
        );

        let err = client
            .create_branch("alice", "demo", "feature", "nope", "t")
            .await
            .expect_err("missing source");
        assert!(err.is_not_found());
        assert_eq!(transport.count(HttpMethod::Post, BASE), 0);
    }

    #[tokio::test]
    async fn list_commits_builds_query() {
        let (client, transport) = client();
        transport.push_json(
            HttpMethod::Get,
            format!("{BASE}/repos/alice/demo/commits?sha=dev&limit=20&page=1"),
            200,
            json!([{"sha": "c1", "commit": {"message": "one"}},
                   {"sha": "c2", "commit": {"message": "two"}}]),
        );

        let commits = client
            .list_commits("alice", "demo", Some("dev"), 20, "t")
            .await
            .expect("commits");
        assert_eq!(commits.iter().map(|c| c.sha.as_str()).collect::<Vec<_>>(), ["c1", "c2"]);
    }

    #[tokio::test]
    async fn repository_by_id_requires_admin_token() {
        let (unconfigured, _) = client_with(GiteaSettings::new("https://git.test"));
        let err = unconfigured.admin_token_auth().expect_err("no admin token");
        assert!(matches!(err, GiteaError::NotConfigured(_)));

        let (client, transport) = client();
        transport.push_json(
            HttpMethod::Get,
            format!("{BASE}/repositories/42"),
            200,
            repo_json(42, "alice", "demo"),
        );
        let auth = client.admin_token_auth().expect("token configured");
        let repo = client.get_repository_by_id(42, auth).await.expect("repo");
        assert_eq!(repo.full_name, "alice/demo");
        assert_eq!(
            transport.requests()[0].header("authorization"),
            Some("token admin-token")
        );
    }
}
