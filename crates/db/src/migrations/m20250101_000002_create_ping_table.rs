//! Create ping table for liveness samples.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Ping::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Ping::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Ping::InstanceId).string().not_null())
                    .col(ColumnDef::new(Ping::Up).boolean().not_null())
                    .col(ColumnDef::new(Ping::LatencyMs).integer().null())
                    .col(
                        ColumnDef::new(Ping::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Index for the recent-pings query
        manager
            .create_index(
                Index::create()
                    .name("idx_ping_instance_created")
                    .table(Ping::Table)
                    .col(Ping::InstanceId)
                    .col(Ping::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Foreign key: instance_id -> instance.id
        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_ping_instance_id")
                    .from(Ping::Table, Ping::InstanceId)
                    .to(Instance::Table, Instance::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Ping::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Ping {
    Table,
    Id,
    InstanceId,
    Up,
    LatencyMs,
    CreatedAt,
}

#[derive(Iden)]
enum Instance {
    Table,
    Id,
}
