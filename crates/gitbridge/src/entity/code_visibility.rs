//! Visibility enum for repository access levels.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Repository visibility, mirrored between the local record and the Git service.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum CodeVisibility {
    #[sea_orm(string_value = "public")]
    #[default]
    Public,
    #[sea_orm(string_value = "private")]
    Private,
}

impl CodeVisibility {
    pub fn from_private(private: bool) -> Self {
        if private {
            CodeVisibility::Private
        } else {
            CodeVisibility::Public
        }
    }
}

impl std::fmt::Display for CodeVisibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodeVisibility::Public => write!(f, "public"),
            CodeVisibility::Private => write!(f, "private"),
        }
    }
}
