//! Connection settings for the Gitea backend.

use serde::Deserialize;

/// Default mail domain used for fallback shadow-account addresses.
pub const DEFAULT_SYNC_DOMAIN: &str = "gitbridge.local";

/// Default request timeout for ordinary API calls, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Gitea connection settings, read once when the client is constructed.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GiteaSettings {
    /// Base URL of the Gitea instance (e.g. `https://git.example.com`).
    pub base_url: String,
    /// Site administrator account used for the admin endpoints.
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    /// Administrator API token used for ID-based repository lookups.
    pub admin_token: Option<String>,
    /// Domain for `{username}@{sync_domain}` fallback addresses.
    pub sync_domain: String,
    /// Branch name requested for auto-initialized repositories.
    pub default_branch: String,
    /// Host advertised in SSH clone URLs. Defaults to the host of `base_url`.
    pub ssh_host: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for GiteaSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            admin_username: None,
            admin_password: None,
            admin_token: None,
            sync_domain: DEFAULT_SYNC_DOMAIN.to_string(),
            default_branch: "main".to_string(),
            ssh_host: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl GiteaSettings {
    /// Settings pointing at `base_url` with everything else defaulted.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Base URL without trailing slashes.
    pub fn normalized_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Administrative token, ignoring blank values.
    pub fn admin_token(&self) -> Option<&str> {
        non_blank(self.admin_token.as_deref())
    }

    /// Administrative basic-auth credentials, when both halves are present.
    pub fn admin_credentials(&self) -> Option<(&str, &str)> {
        Some((
            non_blank(self.admin_username.as_deref())?,
            non_blank(self.admin_password.as_deref())?,
        ))
    }

    /// Host used in derived SSH URLs.
    pub fn ssh_host(&self) -> String {
        if let Some(host) = non_blank(self.ssh_host.as_deref()) {
            return host.to_string();
        }
        url::Url::parse(self.normalized_base_url())
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| "localhost".to_string())
    }

    /// Names of missing administrative settings, for startup warnings.
    pub fn missing_admin_settings(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if non_blank(self.admin_username.as_deref()).is_none() {
            missing.push("admin_username");
        }
        if non_blank(self.admin_password.as_deref()).is_none() {
            missing.push("admin_password");
        }
        if self.admin_token().is_none() {
            missing.push("admin_token");
        }
        missing
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
