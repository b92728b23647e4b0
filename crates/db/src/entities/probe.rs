//! Probe entity: one typed measurement belonging to a ping.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A single measurement taken during a liveness check, e.g. the HTTPS
/// request or the IPv6 resolution. Immutable after insert.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "probe")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Ping this measurement belongs to.
    #[sea_orm(indexed)]
    pub ping_id: String,

    /// Measurement kind ("https", "ipv6").
    pub kind: String,

    /// Whether the measurement succeeded.
    pub success: bool,

    /// Failure detail or extra context.
    #[sea_orm(nullable)]
    pub detail: Option<String>,

    /// Duration of the measurement, when it completed.
    #[sea_orm(nullable)]
    pub latency_ms: Option<i32>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::ping::Entity",
        from = "Column::PingId",
        to = "super::ping::Column::Id",
        on_delete = "Cascade"
    )]
    Ping,
}

impl Related<super::ping::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ping.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
