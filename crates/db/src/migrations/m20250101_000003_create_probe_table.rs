//! Create probe table for per-ping measurements.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Probe::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Probe::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Probe::PingId).string().not_null())
                    .col(ColumnDef::new(Probe::Kind).string().not_null())
                    .col(ColumnDef::new(Probe::Success).boolean().not_null())
                    .col(ColumnDef::new(Probe::Detail).string().null())
                    .col(ColumnDef::new(Probe::LatencyMs).integer().null())
                    .col(
                        ColumnDef::new(Probe::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Index for fetching a ping's probes
        manager
            .create_index(
                Index::create()
                    .name("idx_probe_ping_id")
                    .table(Probe::Table)
                    .col(Probe::PingId)
                    .to_owned(),
            )
            .await?;

        // Foreign key: ping_id -> ping.id
        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_probe_ping_id")
                    .from(Probe::Table, Probe::PingId)
                    .to(Ping::Table, Ping::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Probe::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Probe {
    Table,
    Id,
    PingId,
    Kind,
    Success,
    Detail,
    LatencyMs,
    CreatedAt,
}

#[derive(Iden)]
enum Ping {
    Table,
    Id,
}
