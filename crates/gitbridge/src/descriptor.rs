//! Read-only projections of remote repository state.
//!
//! None of these are persisted. They are fetched on demand and, for
//! repositories, enriched with locally derived access URLs.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entity::code_visibility::CodeVisibility;

/// Access URLs for a repository on the Git service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryUrls {
    pub html_url: String,
    pub clone_url: String,
    pub ssh_url: String,
}

/// A repository on the Git service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryDescriptor {
    /// Remote repository ID.
    pub id: i64,
    pub name: String,
    /// `owner/name`.
    pub full_name: String,
    pub description: Option<String>,
    pub visibility: CodeVisibility,
    pub owner: String,
    pub default_branch: String,
    pub urls: RepositoryUrls,
    /// Size in KB.
    pub size_kb: u64,
    pub stars: u32,
    pub watchers: u32,
    pub empty: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl RepositoryDescriptor {
    pub fn is_private(&self) -> bool {
        self.visibility == CodeVisibility::Private
    }
}

/// Author or committer identity on a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signature {
    pub name: String,
    pub email: String,
    pub date: Option<DateTime<Utc>>,
}

/// A branch and the commit it points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchDescriptor {
    pub name: String,
    pub head_sha: String,
    pub head_message: String,
    pub protected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitDescriptor {
    pub sha: String,
    pub message: String,
    pub author: Option<Signature>,
    pub committer: Option<Signature>,
    /// Login of the linked author account, when the forge could resolve one.
    pub author_login: Option<String>,
    pub html_url: Option<String>,
}

impl CommitDescriptor {
    /// First line of the commit message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }

    pub fn short_sha(&self) -> &str {
        self.sha.get(..10).unwrap_or(self.sha.as_str())
    }
}

/// Kind of a repository content entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    File,
    Dir,
    Symlink,
    Submodule,
}

impl ContentKind {
    pub fn parse(kind: &str) -> Self {
        match kind {
            "dir" => ContentKind::Dir,
            "symlink" => ContentKind::Symlink,
            "submodule" => ContentKind::Submodule,
            _ => ContentKind::File,
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentKind::File => write!(f, "file"),
            ContentKind::Dir => write!(f, "dir"),
            ContentKind::Symlink => write!(f, "symlink"),
            ContentKind::Submodule => write!(f, "submodule"),
        }
    }
}

/// A file or directory entry.
///
/// Directory listings leave `content` empty; single-file fetches carry the
/// body in `content`, encoded as described by `encoding`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentDescriptor {
    pub name: String,
    pub path: String,
    pub kind: ContentKind,
    pub size: u64,
    pub sha: String,
    pub encoding: Option<String>,
    pub content: Option<String>,
    pub download_url: Option<String>,
}

impl ContentDescriptor {
    /// Decode the file body. Gitea sends base64 with embedded newlines.
    pub fn decoded_content(&self) -> Option<Vec<u8>> {
        use base64::Engine;

        let content = self.content.as_deref()?;
        match self.encoding.as_deref() {
            Some("base64") => {
                let compact: String = content.split_whitespace().collect();
                base64::engine::general_purpose::STANDARD
                    .decode(compact)
                    .ok()
            }
            _ => Some(content.as_bytes().to_vec()),
        }
    }

    /// Decoded body as text, if it is valid UTF-8.
    pub fn text(&self) -> Option<String> {
        String::from_utf8(self.decoded_content()?).ok()
    }

    pub fn is_dir(&self) -> bool {
        self.kind == ContentKind::Dir
    }
}
