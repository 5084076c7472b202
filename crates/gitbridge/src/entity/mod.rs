//! SeaORM entity definitions for the gitbridge database schema.

pub mod code_visibility;
pub mod local_repository;
pub mod prelude;
pub mod repository_mapping;
pub mod user;
