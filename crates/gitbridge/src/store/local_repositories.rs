use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, RelationTrait, Set,
};
use sea_orm::sea_query::JoinType;

use crate::entity::code_visibility::CodeVisibility;
use crate::entity::local_repository::{ActiveModel, Column, Entity as LocalRepository, Model, Relation};
use crate::entity::repository_mapping;

use super::errors::{Result, StoreError};

/// Fields for a new local repository record.
#[derive(Debug, Clone)]
pub struct NewLocalRepository {
    pub owner_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub default_branch: String,
    pub visibility: CodeVisibility,
}

/// Insert a local repository record and return it with its generated ID.
pub async fn insert<C: ConnectionTrait>(db: &C, repo: NewLocalRepository) -> Result<Model> {
    if repo.name.trim().is_empty() {
        return Err(StoreError::invalid_input("repository name is required"));
    }

    ActiveModel {
        owner_id: Set(repo.owner_id),
        name: Set(repo.name),
        description: Set(repo.description.filter(|d| !d.is_empty())),
        default_branch: Set(repo.default_branch),
        visibility: Set(repo.visibility),
        created_at: Set(Utc::now().fixed_offset()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| StoreError::from_write(e, "repository"))
}

pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i32) -> Result<Option<Model>> {
    LocalRepository::find_by_id(id)
        .one(db)
        .await
        .map_err(StoreError::from)
}

pub async fn find_by_owner<C: ConnectionTrait>(db: &C, owner_id: i32) -> Result<Vec<Model>> {
    LocalRepository::find()
        .filter(Column::OwnerId.eq(owner_id))
        .order_by_asc(Column::Id)
        .all(db)
        .await
        .map_err(StoreError::from)
}

/// Local repositories that have no mapping row.
pub async fn find_unmapped<C: ConnectionTrait>(db: &C) -> Result<Vec<Model>> {
    LocalRepository::find()
        .join(JoinType::LeftJoin, Relation::Mapping.def())
        .filter(repository_mapping::Column::Id.is_null())
        .order_by_asc(Column::Id)
        .all(db)
        .await
        .map_err(StoreError::from)
}
