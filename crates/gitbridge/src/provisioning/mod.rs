//! Shadow-account provisioning.
//!
//! Guarantees that a platform user has a correlated Gitea account and a
//! usable API token, creating both on first use.

mod password;
mod service;
mod username;

use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::retry::{INITIAL_BACKOFF_MS, MAX_BACKOFF_MS, RetryConfig};

pub use password::{PASSWORD_LEN, generate_password};
pub use service::ShadowAccountService;
pub use username::{MAX_SHADOW_USERNAME_LEN, derive_shadow_username};

/// Default number of token-mint attempts.
pub const DEFAULT_TOKEN_MINT_ATTEMPTS: u32 = 2;

/// Tunables for provisioning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisioningOptions {
    /// Attempts at minting a token with the transient password, including the
    /// first one. Only transport errors and 5xx responses are retried.
    pub token_mint_attempts: u32,
    /// Prefix of minted token names; a random suffix keeps names unique.
    pub token_label_prefix: String,
    pub retry_min_delay_ms: u64,
    pub retry_max_delay_ms: u64,
}

impl Default for ProvisioningOptions {
    fn default() -> Self {
        Self {
            token_mint_attempts: DEFAULT_TOKEN_MINT_ATTEMPTS,
            token_label_prefix: "gitbridge".to_string(),
            retry_min_delay_ms: INITIAL_BACKOFF_MS,
            retry_max_delay_ms: MAX_BACKOFF_MS,
        }
    }
}

impl ProvisioningOptions {
    pub fn token_retry(&self) -> RetryConfig {
        RetryConfig::new(
            std::time::Duration::from_millis(self.retry_min_delay_ms),
            std::time::Duration::from_millis(self.retry_max_delay_ms.max(self.retry_min_delay_ms)),
            0,
        )
        .with_attempts(self.token_mint_attempts)
    }
}

/// A complete shadow-account credential.
#[derive(Clone, PartialEq, Eq)]
pub struct ShadowCredential {
    pub username: String,
    pub access_token: String,
}

impl std::fmt::Debug for ShadowCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShadowCredential")
            .field("username", &self.username)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Outcome of [`ShadowAccountService::ensure_shadow_account`].
#[derive(Clone, PartialEq, Eq)]
pub struct ShadowAccountResult {
    pub success: bool,
    pub username: Option<String>,
    pub access_token: Option<String>,
    /// Generic, user-presentable failure message.
    pub error_message: Option<String>,
}

impl ShadowAccountResult {
    pub fn succeeded(credential: ShadowCredential) -> Self {
        Self {
            success: true,
            username: Some(credential.username),
            access_token: Some(credential.access_token),
            error_message: None,
        }
    }

    pub fn failed(err: &SyncError) -> Self {
        Self {
            success: false,
            username: None,
            access_token: None,
            error_message: Some(err.public_message().to_string()),
        }
    }

    /// The credential, when provisioning succeeded.
    pub fn credential(&self) -> Option<ShadowCredential> {
        match (self.success, &self.username, &self.access_token) {
            (true, Some(username), Some(access_token)) => Some(ShadowCredential {
                username: username.clone(),
                access_token: access_token.clone(),
            }),
            _ => None,
        }
    }
}

impl std::fmt::Debug for ShadowAccountResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShadowAccountResult")
            .field("success", &self.success)
            .field("username", &self.username)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("error_message", &self.error_message)
            .finish()
    }
}
