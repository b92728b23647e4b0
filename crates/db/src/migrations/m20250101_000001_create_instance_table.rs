//! Create instance table for the directory registry.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create instance table
        manager
            .create_table(
                Table::create()
                    .table(Instance::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Instance::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Instance::Name)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Instance::Title).string().null())
                    .col(ColumnDef::new(Instance::ShortDescription).string().null())
                    .col(ColumnDef::new(Instance::Description).text().null())
                    .col(
                        ColumnDef::new(Instance::Uptime)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Instance::UptimeAll)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Instance::Up)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Instance::Ipv6)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Instance::Users).big_integer().null())
                    .col(ColumnDef::new(Instance::Statuses).string().null())
                    .col(ColumnDef::new(Instance::Connections).big_integer().null())
                    .col(
                        ColumnDef::new(Instance::OpenRegistrations)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Instance::Dead)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Instance::Blacklisted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Instance::Version).string().null())
                    .col(ColumnDef::new(Instance::HttpsScore).integer().null())
                    .col(ColumnDef::new(Instance::HttpsRank).string().null())
                    .col(ColumnDef::new(Instance::ObsScore).integer().null())
                    .col(ColumnDef::new(Instance::ObsRank).string().null())
                    .col(
                        ColumnDef::new(Instance::LatestObsCheck)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Instance::FirstUptime)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Instance::Infos).json_binary().null())
                    .col(
                        ColumnDef::new(Instance::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Instance::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Create index on name for lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_instance_name")
                    .table(Instance::Table)
                    .col(Instance::Name)
                    .to_owned(),
            )
            .await?;

        // Create index on dead for efficient filtering
        manager
            .create_index(
                Index::create()
                    .name("idx_instance_dead")
                    .table(Instance::Table)
                    .col(Instance::Dead)
                    .to_owned(),
            )
            .await?;

        // Create index on blacklisted for efficient filtering
        manager
            .create_index(
                Index::create()
                    .name("idx_instance_blacklisted")
                    .table(Instance::Table)
                    .col(Instance::Blacklisted)
                    .to_owned(),
            )
            .await?;

        // Create index on uptime_all for the aggregation predicate
        manager
            .create_index(
                Index::create()
                    .name("idx_instance_uptime_all")
                    .table(Instance::Table)
                    .col(Instance::UptimeAll)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Instance::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Instance {
    Table,
    Id,
    Name,
    Title,
    ShortDescription,
    Description,
    Uptime,
    UptimeAll,
    Up,
    Ipv6,
    Users,
    Statuses,
    Connections,
    OpenRegistrations,
    Dead,
    Blacklisted,
    Version,
    HttpsScore,
    HttpsRank,
    ObsScore,
    ObsRank,
    LatestObsCheck,
    FirstUptime,
    Infos,
    CreatedAt,
    UpdatedAt,
}
