//! Gitbridge CLI - operate shadow accounts and synchronized repositories.

mod commands;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::Term;
use tracing_subscriber::EnvFilter;

use crate::commands::output::OutputFormat;

#[derive(Parser)]
#[command(name = "gitbridge")]
#[command(version)]
#[command(about = "Shadow Gitea accounts and repository synchronization")]
#[command(
    long_about = "Gitbridge gives platform users a correlated Gitea account, creates \
repositories on Gitea on their behalf and keeps a local record and mapping of each \
repository. Browsing commands read through to Gitea."
)]
#[command(after_long_help = r#"EXAMPLES
    Check that Gitea answers:
        $ gitbridge probe

    Register a user and provision their Gitea account:
        $ gitbridge user add alice alice@example.com
        $ gitbridge user provision 1

    Create a repository for user 1:
        $ gitbridge repo create --user 1 demo --description "Demo project"

    Audit accounts and mappings:
        $ gitbridge audit --output json

CONFIGURATION
    Gitbridge reads configuration from:
      1. ~/.config/gitbridge/config.toml (or $XDG_CONFIG_HOME/gitbridge/config.toml)
      2. ./gitbridge.toml
      3. Environment variables (GITBRIDGE_* prefix, nested keys joined with __)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    GITBRIDGE_DATABASE__URL            Database connection string
    GITBRIDGE_GITEA__BASE_URL          Gitea base URL
    GITBRIDGE_GITEA__ADMIN_USERNAME    Gitea site administrator
    GITBRIDGE_GITEA__ADMIN_PASSWORD    Administrator password
    GITBRIDGE_GITEA__ADMIN_TOKEN       Administrator API token
    GITBRIDGE_GITEA__SYNC_DOMAIN       Domain for fallback account emails
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Check that the Gitea service answers
    Probe,
    /// Platform users and their shadow accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Repositories
    Repo {
        #[command(subcommand)]
        action: RepoAction,
    },
    /// Report shadow-account and mapping inconsistencies
    Audit {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
    /// Generate man page(s)
    Man {
        /// Output directory for man pages (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub(crate) enum MigrateAction {
    /// Apply all pending migrations
    Up,
    /// Rollback the last migration
    Down,
    /// Show migration status
    Status,
    /// Fresh install - drop all tables and reapply migrations
    Fresh,
}

#[derive(Subcommand)]
pub(crate) enum UserAction {
    /// Register a platform user
    Add {
        username: String,
        email: String,
        #[arg(short, long)]
        display_name: Option<String>,
    },
    /// List platform users and their correlation state
    List {
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Ensure a user has a Gitea account and token
    Provision {
        user_id: i32,
        /// Print the access token
        #[arg(long)]
        show_token: bool,
    },
}

#[derive(Subcommand)]
pub(crate) enum RepoAction {
    /// Create a repository on Gitea and record it locally
    Create {
        /// Platform user who will own the repository
        #[arg(short, long)]
        user: i32,
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(short, long)]
        private: bool,
    },
    /// List repositories visible to a user on Gitea
    List {
        #[arg(short, long)]
        user: i32,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Search repositories by keyword
    Search {
        keyword: String,
        /// Search with this user's token (anonymous if omitted)
        #[arg(short, long)]
        user: Option<i32>,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Show the Gitea repository mapped to a local repository
    Show {
        local_id: i32,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// List branches
    Branches {
        #[arg(short, long)]
        user: i32,
        owner: String,
        repo: String,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Create a branch from an existing one
    Branch {
        #[arg(short, long)]
        user: i32,
        owner: String,
        repo: String,
        name: String,
        /// Source branch
        #[arg(short, long)]
        from: String,
    },
    /// Show recent commits
    Commits {
        #[arg(short, long)]
        user: i32,
        owner: String,
        repo: String,
        #[arg(short, long)]
        branch: Option<String>,
        #[arg(short, long, default_value_t = gitbridge::sync::DEFAULT_COMMIT_LIMIT)]
        limit: u32,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// List a directory
    Tree {
        #[command(flatten)]
        target: ContentTarget,
        /// Directory path (repository root if omitted)
        #[arg(short, long)]
        path: Option<String>,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Print a file
    File {
        #[command(flatten)]
        target: ContentTarget,
        path: String,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
}

/// Which repository to read content from.
///
/// Either `--user` with `OWNER REPO`, or `--remote-id` (administrator token).
#[derive(Debug, Clone, clap::Args)]
pub(crate) struct ContentTarget {
    #[arg(short, long, conflicts_with = "remote_id", requires_all = ["owner", "repo"])]
    pub user: Option<i32>,
    /// Gitea repository ID
    #[arg(long)]
    pub remote_id: Option<i64>,
    #[arg(long)]
    pub owner: Option<String>,
    #[arg(long)]
    pub repo: Option<String>,
    #[arg(short, long)]
    pub branch: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("gitbridge=info,gitbridge_cli=info"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(Term::stderr().is_term())
        .with_target(false)
        .init();

    let config = config::Config::load();

    let cli = Cli::parse();

    // Commands that need neither the database nor Gitea.
    match &cli.command {
        Commands::Completions { shell } => {
            commands::meta::handle_completions(*shell)?;
            return Ok(());
        }
        Commands::Man { output } => {
            commands::meta::handle_man(output.clone())?;
            return Ok(());
        }
        Commands::Probe => {
            return commands::probe::handle_probe(&config).await;
        }
        _ => {}
    }

    let database_url = config
        .database_url()
        .ok_or("Could not determine a database URL; set GITBRIDGE_DATABASE__URL")?;

    if database_url.starts_with("sqlite://") {
        let db_path = database_url.trim_start_matches("sqlite://");
        let db_path = db_path.split('?').next().unwrap_or(db_path);
        let db_path = std::path::Path::new(db_path);

        if db_path.is_relative() && !db_path.as_os_str().is_empty() {
            tracing::warn!(
                "Database path '{}' is relative - behavior depends on current directory.",
                db_path.display()
            );
        }

        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
    }

    match cli.command {
        Commands::Migrate { action } => {
            commands::migrate::handle_migrate(action, &database_url).await?;
        }
        Commands::User { action } => {
            commands::user::handle_user(action, &config, &database_url).await?;
        }
        Commands::Repo { action } => {
            commands::repo::handle_repo(action, &config, &database_url).await?;
        }
        Commands::Audit { output } => {
            commands::audit::handle_audit(output, &config, &database_url).await?;
        }
        Commands::Completions { .. } | Commands::Man { .. } | Commands::Probe => {}
    }

    Ok(())
}
