//! Repository mapping entity.
//!
//! Correlates one local repository with one Gitea repository and records the
//! access URLs derived when the pair was created. Rows are written once; only
//! `last_sync_date` changes afterwards.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "repository_mappings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Local repository; at most one mapping each.
    #[sea_orm(unique)]
    pub local_repository_id: i32,
    /// Repository ID on the Gitea side.
    pub gitea_repository_id: i64,

    // ─── Derived URLs ───────────────────────────────────────────────────────
    pub html_url: String,
    pub clone_url: String,
    pub ssh_url: String,

    pub created_at: DateTimeWithTimeZone,
    /// Last time a read-through refreshed this mapping.
    pub last_sync_date: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::local_repository::Entity",
        from = "Column::LocalRepositoryId",
        to = "super::local_repository::Column::Id",
        on_delete = "Cascade"
    )]
    LocalRepository,
}

impl Related<super::local_repository::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LocalRepository.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
