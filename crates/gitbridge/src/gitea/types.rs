//! Gitea API wire types.
//!
//! Only the fields we use are declared. Fields that some Gitea versions omit
//! are defaulted rather than required.
//!
//! API docs: https://docs.gitea.com/api/1.22/

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Repository as returned by the repository endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct GiteaRepo {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub empty: bool,
    pub owner: GiteaUser,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub clone_url: Option<String>,
    #[serde(default)]
    pub ssh_url: Option<String>,
    /// Size in KB.
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub stars_count: u32,
    #[serde(default)]
    pub watchers_count: u32,
    #[serde(default)]
    pub forks_count: u32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// User as embedded in other payloads and returned by `/users/{name}`.
#[derive(Debug, Clone, Deserialize)]
pub struct GiteaUser {
    pub id: i64,
    pub login: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// `GET /version`.
#[derive(Debug, Clone, Deserialize)]
pub struct GiteaServerVersion {
    pub version: String,
}

/// `POST /admin/users` body.
#[derive(Debug, Clone, Serialize)]
pub struct CreateUserOption<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub full_name: &'a str,
    pub must_change_password: bool,
    pub send_notify: bool,
}

/// `POST /users/{name}/tokens` body.
#[derive(Debug, Clone, Serialize)]
pub struct CreateAccessTokenOption<'a> {
    pub name: &'a str,
    pub scopes: &'a [&'a str],
}

/// `POST /users/{name}/tokens` response. The token value is only ever
/// returned once, in `sha1`.
#[derive(Debug, Clone, Deserialize)]
pub struct GiteaAccessToken {
    pub sha1: String,
}

/// `POST /user/repos` body.
#[derive(Debug, Clone, Serialize)]
pub struct CreateRepoOption<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub private: bool,
    pub auto_init: bool,
    pub default_branch: &'a str,
    pub readme: &'a str,
}

/// Branch listing entry.
#[derive(Debug, Clone, Deserialize)]
pub struct GiteaBranch {
    pub name: String,
    pub commit: GiteaPayloadCommit,
    #[serde(default)]
    pub protected: bool,
}

/// Head commit embedded in a branch.
#[derive(Debug, Clone, Deserialize)]
pub struct GiteaPayloadCommit {
    pub id: String,
    #[serde(default)]
    pub message: String,
}

/// `POST /repos/{owner}/{repo}/branches` body.
#[derive(Debug, Clone, Serialize)]
pub struct CreateBranchRepoOption<'a> {
    pub new_branch_name: &'a str,
    pub old_ref_name: &'a str,
}

/// Commit listing entry.
#[derive(Debug, Clone, Deserialize)]
pub struct GiteaCommit {
    pub sha: String,
    #[serde(default)]
    pub html_url: Option<String>,
    pub commit: GiteaRepoCommit,
    #[serde(default)]
    pub author: Option<GiteaUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GiteaRepoCommit {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub author: Option<GiteaCommitUser>,
    #[serde(default)]
    pub committer: Option<GiteaCommitUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GiteaCommitUser {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

/// Entry returned by the contents endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GiteaContent {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub sha: String,
    /// `file`, `dir`, `symlink` or `submodule`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
}

/// The contents endpoint returns an object for a file and an array for a
/// directory.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum GiteaContentsResponse {
    Listing(Vec<GiteaContent>),
    Single(Box<GiteaContent>),
}

impl GiteaContentsResponse {
    pub fn into_entries(self) -> Vec<GiteaContent> {
        match self {
            GiteaContentsResponse::Listing(entries) => entries,
            GiteaContentsResponse::Single(entry) => vec![*entry],
        }
    }
}

/// `GET /repos/search` envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct GiteaSearchResults {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub data: Vec<GiteaRepo>,
}
