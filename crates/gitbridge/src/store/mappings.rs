use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

use crate::descriptor::RepositoryUrls;
use crate::entity::local_repository;
use crate::entity::repository_mapping::{ActiveModel, Column, Entity as RepositoryMapping, Model};

use super::errors::{Result, StoreError};
use super::local_repositories::{self, NewLocalRepository};

/// Fields for a new mapping row.
#[derive(Debug, Clone)]
pub struct NewMapping {
    pub local_repository_id: i32,
    pub gitea_repository_id: i64,
    pub urls: RepositoryUrls,
}

/// Insert a mapping.
///
/// # Errors
/// `Conflict` if the local repository already has a mapping.
pub async fn insert<C: ConnectionTrait>(db: &C, mapping: NewMapping) -> Result<Model> {
    ActiveModel {
        local_repository_id: Set(mapping.local_repository_id),
        gitea_repository_id: Set(mapping.gitea_repository_id),
        html_url: Set(mapping.urls.html_url),
        clone_url: Set(mapping.urls.clone_url),
        ssh_url: Set(mapping.urls.ssh_url),
        created_at: Set(Utc::now().fixed_offset()),
        last_sync_date: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| StoreError::from_write(e, "repository mapping"))
}

/// Write the local repository record and its mapping in one transaction.
///
/// Either both rows exist afterwards or neither does.
pub async fn insert_with_local_repository<C: TransactionTrait>(
    db: &C,
    repo: NewLocalRepository,
    gitea_repository_id: i64,
    urls: RepositoryUrls,
) -> Result<(local_repository::Model, Model)> {
    let txn = db.begin().await?;

    let local = local_repositories::insert(&txn, repo).await?;
    let mapping = insert(
        &txn,
        NewMapping {
            local_repository_id: local.id,
            gitea_repository_id,
            urls,
        },
    )
    .await?;

    txn.commit().await?;
    Ok((local, mapping))
}

pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i32) -> Result<Option<Model>> {
    RepositoryMapping::find_by_id(id)
        .one(db)
        .await
        .map_err(StoreError::from)
}

pub async fn find_by_local_id<C: ConnectionTrait>(
    db: &C,
    local_repository_id: i32,
) -> Result<Option<Model>> {
    RepositoryMapping::find()
        .filter(Column::LocalRepositoryId.eq(local_repository_id))
        .one(db)
        .await
        .map_err(StoreError::from)
}

pub async fn find_by_remote_id<C: ConnectionTrait>(
    db: &C,
    gitea_repository_id: i64,
) -> Result<Option<Model>> {
    RepositoryMapping::find()
        .filter(Column::GiteaRepositoryId.eq(gitea_repository_id))
        .order_by_asc(Column::Id)
        .one(db)
        .await
        .map_err(StoreError::from)
}

pub async fn find_all<C: ConnectionTrait>(db: &C) -> Result<Vec<Model>> {
    RepositoryMapping::find()
        .order_by_asc(Column::Id)
        .all(db)
        .await
        .map_err(StoreError::from)
}

/// Set `last_sync_date` to now. Returns whether a row was updated.
pub async fn touch_last_sync<C: ConnectionTrait>(db: &C, id: i32) -> Result<bool> {
    let result = RepositoryMapping::update_many()
        .col_expr(Column::LastSyncDate, Expr::value(Utc::now().fixed_offset()))
        .filter(Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}
