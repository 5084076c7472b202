//! Common re-exports for convenient entity usage.

pub use super::code_visibility::CodeVisibility;
pub use super::local_repository::{
    ActiveModel as LocalRepositoryActiveModel, Column as LocalRepositoryColumn,
    Entity as LocalRepository, Model as LocalRepositoryModel,
};
pub use super::repository_mapping::{
    ActiveModel as RepositoryMappingActiveModel, Column as RepositoryMappingColumn,
    Entity as RepositoryMapping, Model as RepositoryMappingModel,
};
pub use super::user::{
    ActiveModel as UserActiveModel, Column as UserColumn, Entity as User, Model as UserModel,
};
