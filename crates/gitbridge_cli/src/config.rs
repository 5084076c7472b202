//! Configuration file support for gitbridge.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. Environment variables (prefixed with `GITBRIDGE_`, nested keys joined
//!    with `__`, e.g. `GITBRIDGE_GITEA__ADMIN_TOKEN`)
//! 2. Local config file (./gitbridge.toml)
//! 3. XDG config file (~/.config/gitbridge/config.toml)
//! 4. Built-in defaults
//!
//! Gitea settings are read once at startup and handed to the client.
//!
//! Example config file:
//! ```toml
//! [database]
//! url = "sqlite://~/.local/state/gitbridge/gitbridge.db"  # optional, this is the default
//!
//! [gitea]
//! base_url = "https://git.example.com"
//! admin_username = "root"
//! admin_password = "..."   # or GITBRIDGE_GITEA__ADMIN_PASSWORD
//! admin_token = "..."      # or GITBRIDGE_GITEA__ADMIN_TOKEN
//! sync_domain = "users.example.com"
//! default_branch = "main"
//!
//! [provisioning]
//! token_mint_attempts = 2
//! ```

use std::path::PathBuf;

use config::{Config as ConfigBuilder, ConfigError, Environment, File, FileFormat};
use directories::ProjectDirs;
use gitbridge::{GiteaSettings, ProvisioningOptions};
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    /// Gitea connection and administrator credentials.
    pub gitea: GiteaSettings,
    pub provisioning: ProvisioningOptions,
}

/// Database configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL.
    /// Supports sqlite:// and postgres:// schemes.
    pub url: Option<String>,
}

impl Config {
    /// Load configuration from files and the environment.
    ///
    /// Falls back to defaults if the sources cannot be read.
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            tracing::debug!(path = %xdg_config.display(), "Loading config");
            builder = builder.add_source(File::from(xdg_config).format(FileFormat::Toml).required(false));
        }

        let local_config = PathBuf::from("gitbridge.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./gitbridge.toml");
            builder = builder.add_source(File::from(local_config).format(FileFormat::Toml).required(false));
        }

        builder = builder.add_source(environment());

        match Self::build(builder) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        }
    }

    fn build(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        builder.build()?.try_deserialize()
    }

    /// Get the database URL, falling back to the default state directory path.
    ///
    /// The `mode=rwc` parameter creates the SQLite file if it doesn't exist.
    pub fn database_url(&self) -> Option<String> {
        self.database.url.clone().or_else(|| {
            Self::default_state_dir().map(|state_dir| {
                let db_path = state_dir.join("gitbridge.db");
                format!("sqlite://{}?mode=rwc", db_path.display())
            })
        })
    }

    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "gitbridge").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// On Linux, `$XDG_STATE_HOME/gitbridge` or `~/.local/state/gitbridge`.
    /// Elsewhere the data directory.
    pub fn default_state_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "gitbridge").map(|dirs| {
            dirs.state_dir()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dirs.data_dir().to_path_buf())
        })
    }
}

/// `GITBRIDGE_GITEA__BASE_URL` -> `gitea.base_url`.
fn environment() -> Environment {
    Environment::with_prefix("GITBRIDGE")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
