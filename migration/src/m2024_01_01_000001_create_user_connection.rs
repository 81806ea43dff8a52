//! Migration to create the user_connection table.
//!
//! Each row links a local user to one account at an external provider. The
//! credential columns hold hex-encoded ciphertext, everything else is plaintext.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserConnection::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UserConnection::UserId).string_len(255).not_null())
                    .col(
                        ColumnDef::new(UserConnection::ProviderId)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UserConnection::ProviderUserId)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(UserConnection::Rank).integer().not_null())
                    .col(ColumnDef::new(UserConnection::DisplayName).string_len(255).null())
                    .col(ColumnDef::new(UserConnection::ProfileUrl).string_len(512).null())
                    .col(ColumnDef::new(UserConnection::ImageUrl).string_len(512).null())
                    .col(ColumnDef::new(UserConnection::AccessToken).text().not_null())
                    .col(ColumnDef::new(UserConnection::Secret).text().null())
                    .col(ColumnDef::new(UserConnection::RefreshToken).text().null())
                    .col(ColumnDef::new(UserConnection::ExpireTime).big_integer().null())
                    .primary_key(
                        Index::create()
                            .name("pk_user_connection")
                            .col(UserConnection::UserId)
                            .col(UserConnection::ProviderId)
                            .col(UserConnection::ProviderUserId),
                    )
                    .to_owned(),
            )
            .await?;

        // Total order of connections per user and provider
        manager
            .create_index(
                Index::create()
                    .name("idx_user_connection_rank")
                    .table(UserConnection::Table)
                    .col(UserConnection::UserId)
                    .col(UserConnection::ProviderId)
                    .col(UserConnection::Rank)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Reverse lookup from an external identity to local users
        manager
            .create_index(
                Index::create()
                    .name("idx_user_connection_provider_user")
                    .table(UserConnection::Table)
                    .col(UserConnection::ProviderId)
                    .col(UserConnection::ProviderUserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_user_connection_provider_user")
                    .table(UserConnection::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_user_connection_rank")
                    .table(UserConnection::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(UserConnection::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum UserConnection {
    Table,
    UserId,
    ProviderId,
    ProviderUserId,
    Rank,
    DisplayName,
    ProfileUrl,
    ImageUrl,
    AccessToken,
    Secret,
    RefreshToken,
    ExpireTime,
}
