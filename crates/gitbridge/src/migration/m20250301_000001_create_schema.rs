//! Initial migration: users, local repositories and repository mappings.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        self.create_users(manager).await?;
        self.create_repositories(manager).await?;
        self.create_repository_mappings(manager).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RepositoryMappings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Repositories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}

impl Migration {
    async fn create_users(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::Email).string().not_null())
                    .col(ColumnDef::new(Users::DisplayName).string().null())
                    // Shadow-account correlation
                    .col(ColumnDef::new(Users::GiteaUsername).string().null())
                    .col(ColumnDef::new(Users::GiteaAccessToken).text().null())
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn create_repositories(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Repositories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Repositories::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Repositories::OwnerId).integer().not_null())
                    .col(ColumnDef::new(Repositories::Name).string().not_null())
                    .col(ColumnDef::new(Repositories::Description).text().null())
                    .col(
                        ColumnDef::new(Repositories::DefaultBranch)
                            .string()
                            .not_null()
                            .default("main"),
                    )
                    .col(
                        ColumnDef::new(Repositories::Visibility)
                            .string()
                            .not_null()
                            .default("public"),
                    )
                    .col(
                        ColumnDef::new(Repositories::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_repositories_owner")
                            .from(Repositories::Table, Repositories::OwnerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_repositories_owner")
                    .table(Repositories::Table)
                    .col(Repositories::OwnerId)
                    .to_owned(),
            )
            .await
    }

    async fn create_repository_mappings(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RepositoryMappings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RepositoryMappings::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RepositoryMappings::LocalRepositoryId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RepositoryMappings::GiteaRepositoryId)
                            .big_integer()
                            .not_null(),
                    )
                    // Derived URLs
                    .col(ColumnDef::new(RepositoryMappings::HtmlUrl).text().not_null())
                    .col(ColumnDef::new(RepositoryMappings::CloneUrl).text().not_null())
                    .col(ColumnDef::new(RepositoryMappings::SshUrl).text().not_null())
                    // Tracking
                    .col(
                        ColumnDef::new(RepositoryMappings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(RepositoryMappings::LastSyncDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_repository_mappings_local_repository")
                            .from(
                                RepositoryMappings::Table,
                                RepositoryMappings::LocalRepositoryId,
                            )
                            .to(Repositories::Table, Repositories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One mapping per local repository
        manager
            .create_index(
                Index::create()
                    .name("idx_repository_mappings_local_repository")
                    .table(RepositoryMappings::Table)
                    .col(RepositoryMappings::LocalRepositoryId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_repository_mappings_gitea_repository")
                    .table(RepositoryMappings::Table)
                    .col(RepositoryMappings::GiteaRepositoryId)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    Email,
    DisplayName,
    GiteaUsername,
    GiteaAccessToken,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Repositories {
    Table,
    Id,
    OwnerId,
    Name,
    Description,
    DefaultBranch,
    Visibility,
    CreatedAt,
}

#[derive(DeriveIden)]
enum RepositoryMappings {
    Table,
    Id,
    LocalRepositoryId,
    GiteaRepositoryId,
    HtmlUrl,
    CloneUrl,
    SshUrl,
    CreatedAt,
    LastSyncDate,
}
