use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CachedResults::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CachedResults::CacheKey)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CachedResults::Endpoint).string().not_null())
                    .col(ColumnDef::new(CachedResults::Result).text().not_null())
                    .col(ColumnDef::new(CachedResults::CreatedAt).string().not_null())
                    .col(ColumnDef::new(CachedResults::ExpiresAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_cached_results_expires_at")
                    .table(CachedResults::Table)
                    .col(CachedResults::ExpiresAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CachedResults::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CachedResults {
    Table,
    CacheKey,
    Endpoint,
    Result,
    CreatedAt,
    ExpiresAt,
}
