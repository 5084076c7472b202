//! Persistence for platform users, local repositories and repository mappings.
//!
//! All functions are generic over [`sea_orm::ConnectionTrait`] so they run
//! against a pooled connection or inside a transaction.

mod errors;
pub mod local_repositories;
pub mod mappings;
pub mod users;

pub use errors::{Result, StoreError};
pub use local_repositories::NewLocalRepository;
pub use mappings::NewMapping;
pub use users::NewUser;
