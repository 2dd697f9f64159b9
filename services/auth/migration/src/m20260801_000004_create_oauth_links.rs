use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OauthLinks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OauthLinks::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OauthLinks::Provider).string().not_null())
                    .col(ColumnDef::new(OauthLinks::ProviderSub).string().not_null())
                    .col(ColumnDef::new(OauthLinks::UserId).uuid().not_null())
                    .col(ColumnDef::new(OauthLinks::Email).string())
                    .col(ColumnDef::new(OauthLinks::Name).string())
                    .col(ColumnDef::new(OauthLinks::Picture).string())
                    .col(
                        ColumnDef::new(OauthLinks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(OauthLinks::Table, OauthLinks::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(OauthLinks::Table)
                    .col(OauthLinks::Provider)
                    .col(OauthLinks::ProviderSub)
                    .unique()
                    .name("idx_oauth_links_provider_sub")
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(OauthLinks::Table)
                    .col(OauthLinks::UserId)
                    .name("idx_oauth_links_user_id")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OauthLinks::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum OauthLinks {
    Table,
    Id,
    Provider,
    ProviderSub,
    UserId,
    Email,
    Name,
    Picture,
    CreatedAt,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
}
