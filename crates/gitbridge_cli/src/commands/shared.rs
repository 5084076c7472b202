use gitbridge::{GiteaClient, GiteaError, RepositorySyncService, ShadowAccountService};
use sea_orm::{DatabaseConnection, DbErr};

use crate::config::Config;

pub(crate) fn gitea_client(config: &Config) -> Result<GiteaClient, GiteaError> {
    GiteaClient::new(config.gitea.clone())
}

pub(crate) async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    gitbridge::connect_and_migrate(database_url).await
}

pub(crate) fn account_service(
    config: &Config,
    db: DatabaseConnection,
) -> Result<ShadowAccountService, GiteaError> {
    Ok(ShadowAccountService::with_options(
        db,
        gitea_client(config)?,
        config.provisioning.clone(),
    ))
}

pub(crate) async fn sync_service(
    config: &Config,
    database_url: &str,
) -> Result<RepositorySyncService, Box<dyn std::error::Error>> {
    let db = connect(database_url).await?;
    Ok(RepositorySyncService::new(account_service(config, db)?))
}
