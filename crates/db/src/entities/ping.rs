//! Ping entity: one liveness sample per instance per check cycle.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Result of a single liveness check. Immutable after insert.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ping")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Instance this sample belongs to.
    #[sea_orm(indexed)]
    pub instance_id: String,

    /// Whether the instance answered.
    pub up: bool,

    /// Round-trip time of the check, when it completed.
    #[sea_orm(nullable)]
    pub latency_ms: Option<i32>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::instance::Entity",
        from = "Column::InstanceId",
        to = "super::instance::Column::Id",
        on_delete = "Cascade"
    )]
    Instance,
    #[sea_orm(has_many = "super::probe::Entity")]
    Probes,
}

impl Related<super::instance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Instance.def()
    }
}

impl Related<super::probe::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Probes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
