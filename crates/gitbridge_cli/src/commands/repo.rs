use std::io::Write;

use gitbridge::RepositorySyncService;
use gitbridge::descriptor::{BranchDescriptor, CommitDescriptor, ContentDescriptor, RepositoryDescriptor};
use serde::Serialize;
use tabled::Tabled;

use crate::commands::output::{OutputFormat, or_dash, print_json, print_rows, render_table};
use crate::commands::shared::sync_service;
use crate::config::Config;
use crate::{ContentTarget, RepoAction};

#[derive(Debug, Clone, Serialize, Tabled)]
struct RepositoryDisplay {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Repository")]
    full_name: String,
    #[tabled(rename = "Visibility")]
    visibility: String,
    #[tabled(rename = "Default Branch")]
    default_branch: String,
    #[tabled(rename = "Clone URL")]
    clone_url: String,
}

impl From<&RepositoryDescriptor> for RepositoryDisplay {
    fn from(repo: &RepositoryDescriptor) -> Self {
        Self {
            id: repo.id,
            full_name: repo.full_name.clone(),
            visibility: repo.visibility.to_string(),
            default_branch: repo.default_branch.clone(),
            clone_url: repo.urls.clone_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Tabled)]
struct BranchDisplay {
    #[tabled(rename = "Branch")]
    name: String,
    #[tabled(rename = "Head")]
    head: String,
    #[tabled(rename = "Message")]
    message: String,
    #[tabled(rename = "Protected")]
    protected: bool,
}

impl From<&BranchDescriptor> for BranchDisplay {
    fn from(branch: &BranchDescriptor) -> Self {
        Self {
            name: branch.name.clone(),
            head: branch.head_sha.chars().take(10).collect(),
            message: branch.head_message.lines().next().unwrap_or_default().to_string(),
            protected: branch.protected,
        }
    }
}

#[derive(Debug, Clone, Tabled)]
struct CommitDisplay {
    #[tabled(rename = "Commit")]
    sha: String,
    #[tabled(rename = "Author")]
    author: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Summary")]
    summary: String,
}

impl From<&CommitDescriptor> for CommitDisplay {
    fn from(commit: &CommitDescriptor) -> Self {
        let author = commit.author.as_ref();
        Self {
            sha: commit.short_sha().to_string(),
            author: or_dash(author.map(|a| a.name.as_str())),
            date: author
                .and_then(|a| a.date)
                .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string()),
            summary: commit.summary().to_string(),
        }
    }
}

#[derive(Debug, Clone, Tabled)]
struct ContentDisplay {
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Size")]
    size: u64,
}

impl From<&ContentDescriptor> for ContentDisplay {
    fn from(entry: &ContentDescriptor) -> Self {
        Self {
            kind: entry.kind.to_string(),
            path: entry.path.clone(),
            size: entry.size,
        }
    }
}

/// Handle repository commands.
pub(crate) async fn handle_repo(
    action: RepoAction,
    config: &Config,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = sync_service(config, database_url).await?;

    match action {
        RepoAction::Create {
            user,
            name,
            description,
            private,
        } => {
            let result = service.create_repository(user, &name, &description, private).await;
            match (&result.repository, result.local_repository_id) {
                (Some(repo), Some(local_id)) if result.success => {
                    println!("Created {} (local ID {}, Gitea ID {})", repo.full_name, local_id, repo.id);
                    println!("  {}", repo.urls.html_url);
                    println!("  {}", repo.urls.clone_url);
                    println!("  {}", repo.urls.ssh_url);
                }
                _ => {
                    return Err(result
                        .error_message
                        .unwrap_or_else(|| "Repository creation failed".to_string())
                        .into());
                }
            }
        }
        RepoAction::List { user, output } => {
            let repos = service.get_user_repositories(user).await;
            print_repositories(&repos, output)?;
        }
        RepoAction::Search { keyword, user, output } => {
            let repos = service.search_repositories(&keyword, user).await;
            print_repositories(&repos, output)?;
        }
        RepoAction::Show { local_id, output } => {
            let repo = service
                .get_repository_by_local_id(local_id)
                .await
                .ok_or_else(|| format!("No Gitea repository found for local repository {}", local_id))?;
            match output {
                OutputFormat::Table => println!("{}", render_table(vec![RepositoryDisplay::from(&repo)])),
                OutputFormat::Json => print_json(&repo)?,
            }
        }
        RepoAction::Branches {
            user,
            owner,
            repo,
            output,
        } => {
            let branches = service.get_branches(user, &owner, &repo).await;
            let rows = branches.iter().map(BranchDisplay::from).collect();
            print_rows(rows, &branches, output, "No branches.")?;
        }
        RepoAction::Branch {
            user,
            owner,
            repo,
            name,
            from,
        } => {
            if !service.create_branch(user, &owner, &repo, &name, &from).await {
                return Err(format!("Could not create branch '{}' from '{}'", name, from).into());
            }
            println!("Created branch '{}' from '{}' in {}/{}", name, from, owner, repo);
        }
        RepoAction::Commits {
            user,
            owner,
            repo,
            branch,
            limit,
            output,
        } => {
            let commits = service
                .get_commit_history(user, &owner, &repo, branch.as_deref(), limit)
                .await;
            let rows = commits.iter().map(CommitDisplay::from).collect();
            print_rows(rows, &commits, output, "No commits.")?;
        }
        RepoAction::Tree { target, path, output } => {
            let entries = list_directory(&service, &target, path.as_deref()).await?;
            let rows = entries.iter().map(ContentDisplay::from).collect();
            print_rows(rows, &entries, output, "Empty directory.")?;
        }
        RepoAction::File { target, path, output } => {
            let file = read_file(&service, &target, &path)
                .await?
                .ok_or_else(|| format!("File '{}' not found", path))?;
            match output {
                OutputFormat::Json => print_json(&file)?,
                OutputFormat::Table => {
                    let body = file
                        .decoded_content()
                        .ok_or("File content could not be decoded")?;
                    std::io::stdout().write_all(&body)?;
                }
            }
        }
    }
    Ok(())
}

fn print_repositories(repos: &[RepositoryDescriptor], output: OutputFormat) -> Result<(), serde_json::Error> {
    let rows = repos.iter().map(RepositoryDisplay::from).collect();
    print_rows(rows, repos, output, "No repositories.")
}

/// Owner and repository name for user-scoped reads.
fn owner_repo(target: &ContentTarget) -> Result<(&str, &str), String> {
    match (target.owner.as_deref(), target.repo.as_deref()) {
        (Some(owner), Some(repo)) => Ok((owner, repo)),
        _ => Err("--owner and --repo are required with --user".to_string()),
    }
}

async fn list_directory(
    service: &RepositorySyncService,
    target: &ContentTarget,
    path: Option<&str>,
) -> Result<Vec<ContentDescriptor>, String> {
    let branch = target.branch.as_deref();
    match (target.user, target.remote_id) {
        (Some(user), _) => {
            let (owner, repo) = owner_repo(target)?;
            Ok(service.get_directory_content(user, owner, repo, path, branch).await)
        }
        (None, Some(remote_id)) => Ok(service.get_directory_contents(remote_id, branch, path).await),
        (None, None) => Err("Either --user or --remote-id is required".to_string()),
    }
}

async fn read_file(
    service: &RepositorySyncService,
    target: &ContentTarget,
    path: &str,
) -> Result<Option<ContentDescriptor>, String> {
    let branch = target.branch.as_deref();
    match (target.user, target.remote_id) {
        (Some(user), _) => {
            let (owner, repo) = owner_repo(target)?;
            Ok(service.get_file_content(user, owner, repo, path, branch).await)
        }
        (None, Some(remote_id)) => Ok(service.get_repository_file_content(remote_id, path, branch).await),
        (None, None) => Err("Either --user or --remote-id is required".to_string()),
    }
}
