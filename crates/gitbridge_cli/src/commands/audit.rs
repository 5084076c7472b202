use gitbridge::AuditReport;
use gitbridge::ConsistencyAuditor;
use tabled::Tabled;

use crate::commands::output::{OutputFormat, print_json, render_table};
use crate::commands::shared::{connect, gitea_client};
use crate::config::Config;

#[derive(Debug, Clone, Tabled)]
struct UserAuditDisplay {
    #[tabled(rename = "User")]
    username: String,
    #[tabled(rename = "Gitea Account")]
    gitea_username: String,
    #[tabled(rename = "Exists")]
    account_exists: &'static str,
    #[tabled(rename = "Token")]
    token_valid: &'static str,
    #[tabled(rename = "Can Create")]
    can_create_repository: &'static str,
}

/// One anomaly per row.
#[derive(Debug, Clone, PartialEq, Eq, Tabled)]
struct FindingDisplay {
    #[tabled(rename = "Finding")]
    kind: &'static str,
    #[tabled(rename = "Subject")]
    subject: String,
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "NO" }
}

fn findings(report: &AuditReport) -> Vec<FindingDisplay> {
    let mut rows = Vec::new();
    if !report.service_reachable {
        rows.push(FindingDisplay {
            kind: "service unreachable",
            subject: "-".to_string(),
        });
    }
    for user in &report.inconsistent_users {
        rows.push(FindingDisplay {
            kind: "partial correlation",
            subject: format!("user {} ({})", user.user_id, user.username),
        });
    }
    for mapping in &report.stale_mappings {
        rows.push(FindingDisplay {
            kind: "stale mapping",
            subject: format!(
                "mapping {} -> Gitea repository {}",
                mapping.mapping_id, mapping.gitea_repository_id
            ),
        });
    }
    for repo in &report.unmapped_local_repositories {
        rows.push(FindingDisplay {
            kind: "unmapped local repository",
            subject: format!("{} ({})", repo.local_repository_id, repo.name),
        });
    }
    for repo in &report.unmapped_remote_repositories {
        rows.push(FindingDisplay {
            kind: "unmapped Gitea repository",
            subject: format!("{} ({})", repo.gitea_repository_id, repo.full_name),
        });
    }
    rows
}

/// Run the consistency audit. Fails when anything needs attention.
pub(crate) async fn handle_audit(
    output: OutputFormat,
    config: &Config,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = connect(database_url).await?;
    let report = ConsistencyAuditor::new(db, gitea_client(config)?).run().await;

    match output {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            if !report.users.is_empty() {
                let rows: Vec<UserAuditDisplay> = report
                    .users
                    .iter()
                    .map(|u| UserAuditDisplay {
                        username: u.username.clone(),
                        gitea_username: u.gitea_username.clone(),
                        account_exists: yes_no(u.account_exists),
                        token_valid: yes_no(u.token_valid),
                        can_create_repository: yes_no(u.can_create_repository),
                    })
                    .collect();
                println!("{}", render_table(rows));
            }
            let rows = findings(&report);
            if !rows.is_empty() {
                println!("{}", render_table(rows));
            }
            if !report.mappings_checked {
                println!("Mappings were not checked (administrator token missing or service unreachable).");
            }
        }
    }

    match report.anomaly_count() {
        0 => {
            if output == OutputFormat::Table {
                println!("No inconsistencies found.");
            }
            Ok(())
        }
        n => Err(format!("Audit found {} issue(s)", n).into()),
    }
}
