use chrono::Utc;
use sea_orm::sea_query::{Expr, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::entity::user::{ActiveModel, Column, Entity as User, Model, ShadowCorrelation};

use super::errors::{Result, StoreError};

/// Fields needed to register a platform user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
}

/// Insert a platform user.
///
/// # Errors
/// `InvalidInput` for blank username/email, `Conflict` if the username is taken.
pub async fn insert<C: ConnectionTrait>(db: &C, user: NewUser) -> Result<Model> {
    if user.username.trim().is_empty() {
        return Err(StoreError::invalid_input("username is required"));
    }
    if user.email.trim().is_empty() {
        return Err(StoreError::invalid_input("email is required"));
    }

    ActiveModel {
        username: Set(user.username.trim().to_string()),
        email: Set(user.email.trim().to_string()),
        display_name: Set(user.display_name),
        gitea_username: Set(None),
        gitea_access_token: Set(None),
        created_at: Set(Utc::now().fixed_offset()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| StoreError::from_write(e, "user"))
}

pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i32) -> Result<Option<Model>> {
    User::find_by_id(id).one(db).await.map_err(StoreError::from)
}

pub async fn find_by_username<C: ConnectionTrait>(db: &C, username: &str) -> Result<Option<Model>> {
    User::find()
        .filter(Column::Username.eq(username))
        .one(db)
        .await
        .map_err(StoreError::from)
}

/// All users, oldest first.
pub async fn find_all<C: ConnectionTrait>(db: &C) -> Result<Vec<Model>> {
    User::find()
        .order_by_asc(Column::Id)
        .all(db)
        .await
        .map_err(StoreError::from)
}

/// Users with any part of a shadow-account correlation stored.
pub async fn find_with_correlation<C: ConnectionTrait>(db: &C) -> Result<Vec<Model>> {
    User::find()
        .filter(
            Condition::any()
                .add(Column::GiteaUsername.is_not_null())
                .add(Column::GiteaAccessToken.is_not_null()),
        )
        .order_by_asc(Column::Id)
        .all(db)
        .await
        .map_err(StoreError::from)
}

/// Store a shadow-account correlation unless a complete one is already present.
///
/// The row is read and classified first. The `UPDATE` then only matches while
/// both columns still hold the values that were read, so a concurrent writer
/// makes it affect no rows. Returns `true` if this call wrote the correlation
/// and `false` if a complete one is stored (or the user is gone).
pub async fn set_correlation_if_absent<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    gitea_username: &str,
    access_token: &str,
) -> Result<bool> {
    if gitea_username.trim().is_empty() || access_token.trim().is_empty() {
        return Err(StoreError::invalid_input(
            "correlation requires both username and token",
        ));
    }

    let Some(current) = find_by_id(db, user_id).await? else {
        return Ok(false);
    };
    if let ShadowCorrelation::Complete { .. } = current.shadow_correlation() {
        return Ok(false);
    }

    let result = User::update_many()
        .col_expr(Column::GiteaUsername, Expr::value(gitea_username))
        .col_expr(Column::GiteaAccessToken, Expr::value(access_token))
        .filter(Column::Id.eq(user_id))
        .filter(unchanged(Column::GiteaUsername, current.gitea_username.as_deref()))
        .filter(unchanged(Column::GiteaAccessToken, current.gitea_access_token.as_deref()))
        .exec(db)
        .await?;

    Ok(result.rows_affected == 1)
}

fn unchanged(column: Column, observed: Option<&str>) -> SimpleExpr {
    match observed {
        Some(value) => column.eq(value),
        None => column.is_null(),
    }
}
