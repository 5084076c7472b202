//! Local repository entity.
//!
//! The platform-side record of a repository. It is only ever created after the
//! Gitea repository exists, together with its mapping.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::code_visibility::CodeVisibility;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "repositories")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Owning platform user.
    pub owner_id: i32,
    pub name: String,
    pub description: Option<String>,
    #[sea_orm(default_value = "main")]
    pub default_branch: String,
    pub visibility: CodeVisibility,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Owner,
    #[sea_orm(has_one = "super::repository_mapping::Entity")]
    Mapping,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::repository_mapping::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Mapping.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
