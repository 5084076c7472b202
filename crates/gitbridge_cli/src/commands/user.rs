use gitbridge::UserModel;
use gitbridge::entity::user::ShadowCorrelation;
use gitbridge::store::{NewUser, users};
use serde::Serialize;
use tabled::Tabled;

use crate::UserAction;
use crate::commands::output::{or_dash, print_rows};
use crate::commands::shared::{account_service, connect};
use crate::config::Config;

/// Display struct for user listing. Never carries the token.
#[derive(Debug, Clone, Serialize, Tabled)]
struct UserDisplay {
    #[tabled(rename = "ID")]
    id: i32,
    #[tabled(rename = "Username")]
    username: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Gitea Account")]
    gitea_username: String,
    #[tabled(rename = "Shadow Account")]
    shadow_account: &'static str,
    #[tabled(rename = "Created")]
    created_at: String,
}

impl From<&UserModel> for UserDisplay {
    fn from(user: &UserModel) -> Self {
        let shadow_account = match user.shadow_correlation() {
            ShadowCorrelation::Absent => "none",
            ShadowCorrelation::Partial => "inconsistent",
            ShadowCorrelation::Complete { .. } => "linked",
        };
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            gitea_username: or_dash(user.gitea_username.as_deref()),
            shadow_account,
            created_at: user.created_at.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Handle user management commands.
pub(crate) async fn handle_user(
    action: UserAction,
    config: &Config,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = connect(database_url).await?;

    match action {
        UserAction::Add {
            username,
            email,
            display_name,
        } => {
            let user = users::insert(
                &db,
                NewUser {
                    username,
                    email,
                    display_name,
                },
            )
            .await?;
            println!("Added user '{}' with ID {}", user.username, user.id);
        }
        UserAction::List { output } => {
            let all = users::find_all(&db).await?;
            let rows: Vec<UserDisplay> = all.iter().map(UserDisplay::from).collect();
            print_rows(rows.clone(), &rows, output, "No users.")?;
        }
        UserAction::Provision { user_id, show_token } => {
            let service = account_service(config, db)?;
            let result = service.ensure_shadow_account(user_id).await;
            let Some(credential) = result.credential() else {
                return Err(result
                    .error_message
                    .unwrap_or_else(|| "Provisioning failed".to_string())
                    .into());
            };
            println!("User {} is linked to Gitea account '{}'", user_id, credential.username);
            if show_token {
                println!("{}", credential.access_token);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(gitea_username: Option<&str>, token: Option<&str>) -> UserModel {
        UserModel {
            id: 7,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            display_name: None,
            gitea_username: gitea_username.map(str::to_string),
            gitea_access_token: token.map(str::to_string),
            created_at: chrono::DateTime::parse_from_rfc3339("2025-03-01T10:00:00+00:00")
                .expect("valid timestamp"),
        }
    }

    #[test]
    fn display_reflects_correlation() {
        assert_eq!(UserDisplay::from(&user(None, None)).shadow_account, "none");
        assert_eq!(UserDisplay::from(&user(Some("alice"), None)).shadow_account, "inconsistent");

        let linked = UserDisplay::from(&user(Some("alice"), Some("secret")));
        assert_eq!(linked.shadow_account, "linked");
        assert_eq!(linked.gitea_username, "alice");
        assert_eq!(linked.created_at, "2025-03-01");
    }

    #[test]
    fn json_never_contains_token() {
        let row = UserDisplay::from(&user(Some("alice"), Some("secret")));
        let json = serde_json::to_string(&row).expect("serialize");
        assert!(!json.contains("secret"));
    }
}
