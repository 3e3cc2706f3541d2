use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Recordings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Recordings::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Recordings::Filename).string().not_null())
                    .col(ColumnDef::new(Recordings::Filepath).string().not_null())
                    .col(ColumnDef::new(Recordings::Filesize).big_integer().not_null())
                    .col(
                        ColumnDef::new(Recordings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_recordings_created_at")
                    .table(Recordings::Table)
                    .col(Recordings::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Recordings::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Recordings {
    Table,
    Id,
    Filename,
    Filepath,
    Filesize,
    #[iden = "createdAt"]
    CreatedAt,
}
