//! Gitea transport client.
//!
//! Speaks the Gitea REST API (`{base_url}/api/v1`) for account
//! administration, token minting, repository lifecycle and read-only content
//! browsing. Everything here is mechanical: business rules live in
//! [`crate::provisioning`] and [`crate::sync`].
//!
//! # Module Structure
//!
//! - [`error`] - Error types for Gitea API operations
//! - [`settings`] - Connection settings and credential accessors
//! - [`types`] - Wire types
//! - [`client`] - The API client
//! - [`convert`] - Conversion from wire types to descriptors
//!
//! ```ignore
//! use gitbridge::gitea::{GiteaClient, GiteaSettings};
//!
//! let client = GiteaClient::new(GiteaSettings::new("https://git.example.com"))?;
//! if client.probe().await {
//!     let repos = client.list_user_repositories("token").await?;
//! }
//! ```

mod client;
mod convert;
mod error;
mod settings;
mod types;

pub use client::{
    Auth, GiteaClient, MIN_PASSWORD_LEN, PROBE_TIMEOUT, TOKEN_SCOPES, UserCreation,
    fallback_email,
};
pub use convert::derive_urls;
pub use error::{GiteaError, short_error_message};
pub use settings::{DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SYNC_DOMAIN, GiteaSettings};
pub use types::{GiteaRepo, GiteaUser};
