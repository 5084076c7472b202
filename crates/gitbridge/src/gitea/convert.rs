//! Conversion from Gitea wire types to descriptors.

use super::settings::GiteaSettings;
use super::types::{GiteaBranch, GiteaCommit, GiteaCommitUser, GiteaContent, GiteaRepo};
use crate::descriptor::{
    BranchDescriptor, CommitDescriptor, ContentDescriptor, ContentKind, RepositoryDescriptor,
    RepositoryUrls, Signature,
};
use crate::entity::code_visibility::CodeVisibility;

/// Compute access URLs from the configured base URL.
///
/// Some API versions omit the URL fields, so they are never taken from the
/// response.
pub fn derive_urls(settings: &GiteaSettings, owner: &str, name: &str) -> RepositoryUrls {
    let base = settings.normalized_base_url();
    RepositoryUrls {
        html_url: format!("{}/{}/{}", base, owner, name),
        clone_url: format!("{}/{}/{}.git", base, owner, name),
        ssh_url: format!("git@{}:{}/{}.git", settings.ssh_host(), owner, name),
    }
}

/// Convert a Gitea repository into a [`RepositoryDescriptor`].
pub fn to_repository_descriptor(repo: &GiteaRepo, settings: &GiteaSettings) -> RepositoryDescriptor {
    let owner = repo.owner.login.clone();
    let full_name = if repo.full_name.is_empty() {
        format!("{}/{}", owner, repo.name)
    } else {
        repo.full_name.clone()
    };

    RepositoryDescriptor {
        id: repo.id,
        name: repo.name.clone(),
        full_name,
        description: repo.description.clone().filter(|d| !d.is_empty()),
        visibility: if repo.private {
            CodeVisibility::Private
        } else {
            CodeVisibility::Public
        },
        urls: derive_urls(settings, &owner, &repo.name),
        owner,
        default_branch: repo
            .default_branch
            .clone()
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| settings.default_branch.clone()),
        size_kb: repo.size,
        stars: repo.stars_count,
        watchers: repo.watchers_count,
        empty: repo.empty,
        created_at: repo.created_at,
        updated_at: repo.updated_at,
    }
}

pub fn to_branch_descriptor(branch: &GiteaBranch) -> BranchDescriptor {
    BranchDescriptor {
        name: branch.name.clone(),
        head_sha: branch.commit.id.clone(),
        head_message: branch.commit.message.clone(),
        protected: branch.protected,
    }
}

fn to_signature(user: &GiteaCommitUser) -> Signature {
    Signature {
        name: user.name.clone(),
        email: user.email.clone(),
        date: user.date,
    }
}

pub fn to_commit_descriptor(commit: &GiteaCommit) -> CommitDescriptor {
    CommitDescriptor {
        sha: commit.sha.clone(),
        message: commit.commit.message.clone(),
        author: commit.commit.author.as_ref().map(to_signature),
        committer: commit.commit.committer.as_ref().map(to_signature),
        author_login: commit.author.as_ref().map(|u| u.login.clone()),
        html_url: commit.html_url.clone(),
    }
}

pub fn to_content_descriptor(content: GiteaContent) -> ContentDescriptor {
    ContentDescriptor {
        kind: ContentKind::parse(&content.kind),
        name: content.name,
        path: content.path,
        size: content.size,
        sha: content.sha,
        encoding: content.encoding,
        content: content.content,
        download_url: content.download_url,
    }
}
