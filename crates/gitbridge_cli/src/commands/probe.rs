use crate::commands::shared::gitea_client;
use crate::config::Config;

/// Check that Gitea answers, and report its version.
pub(crate) async fn handle_probe(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let client = gitea_client(config)?;

    if !client.probe().await {
        return Err(format!("Gitea at {} is not reachable", client.base_url()).into());
    }

    let version = client.server_version().await?;
    println!("Gitea {} reachable at {}", version, client.base_url());

    let missing = config.gitea.missing_admin_settings();
    if !missing.is_empty() {
        println!("Missing administrator settings: {}", missing.join(", "));
    }
    Ok(())
}
