//! Platform user entity.
//!
//! Users are owned by the surrounding platform; gitbridge only reads them and
//! writes the shadow-account correlation columns.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Local login name.
    #[sea_orm(unique)]
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,

    // ─── Shadow-account correlation ─────────────────────────────────────────
    /// Login of the correlated Gitea account.
    pub gitea_username: Option<String>,
    /// API token of the correlated Gitea account.
    #[serde(skip_serializing)]
    pub gitea_access_token: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::local_repository::Entity")]
    LocalRepository,
}

impl Related<super::local_repository::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LocalRepository.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// State of a user's shadow-account correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowCorrelation<'a> {
    Absent,
    /// Only one of username/token is stored.
    Partial,
    Complete { username: &'a str, token: &'a str },
}

impl Model {
    /// Classify the stored correlation. Blank values count as missing.
    pub fn shadow_correlation(&self) -> ShadowCorrelation<'_> {
        let username = non_blank(self.gitea_username.as_deref());
        let token = non_blank(self.gitea_access_token.as_deref());
        match (username, token) {
            (Some(username), Some(token)) => ShadowCorrelation::Complete { username, token },
            (None, None) => ShadowCorrelation::Absent,
            _ => ShadowCorrelation::Partial,
        }
    }

    /// Name shown in the Gitea profile.
    pub fn display_name_or_username(&self) -> &str {
        non_blank(self.display_name.as_deref()).unwrap_or(&self.username)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(gitea_username: Option<&str>, token: Option<&str>) -> Model {
        Model {
            id: 1,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            display_name: None,
            gitea_username: gitea_username.map(str::to_string),
            gitea_access_token: token.map(str::to_string),
            created_at: Utc::now().fixed_offset(),
        }
    }

    #[test]
    fn correlation_states() {
        assert_eq!(user(None, None).shadow_correlation(), ShadowCorrelation::Absent);
        assert_eq!(
            user(Some("alice"), None).shadow_correlation(),
            ShadowCorrelation::Partial
        );
        assert_eq!(
            user(Some(""), Some("tok")).shadow_correlation(),
            ShadowCorrelation::Partial
        );
        assert_eq!(user(Some(" "), Some("")).shadow_correlation(), ShadowCorrelation::Absent);
        assert_eq!(
            user(Some("alice"), Some("tok")).shadow_correlation(),
            ShadowCorrelation::Complete {
                username: "alice",
                token: "tok"
            }
        );
    }

    #[test]
    fn token_is_never_serialized() {
        let json = serde_json::to_value(user(Some("alice"), Some("secret"))).expect("serialize");
        assert!(json.get("gitea_access_token").is_none());
        assert_eq!(json["gitea_username"], "alice");
    }

    #[test]
    fn display_name_falls_back_to_username() {
        let mut model = user(None, None);
        assert_eq!(model.display_name_or_username(), "alice");
        model.display_name = Some("Alice A.".to_string());
        assert_eq!(model.display_name_or_username(), "Alice A.");
    }
}
