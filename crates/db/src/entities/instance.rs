//! Instance entity: one row per registered server in the directory.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A registered server and its monitored state.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "instance")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The hostname of this instance (unique identifier).
    #[sea_orm(unique)]
    pub name: String,

    /// Display title.
    #[sea_orm(nullable)]
    pub title: Option<String>,

    /// One-line description shown in the export feed.
    #[sea_orm(nullable)]
    pub short_description: Option<String>,

    /// Longer description shown in the export feed.
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    /// Fraction of recent liveness checks that succeeded, in [0, 1].
    #[sea_orm(default_value = 0.0)]
    pub uptime: f64,

    /// Fraction of all liveness checks that succeeded, in [0, 1].
    #[sea_orm(default_value = 0.0)]
    pub uptime_all: f64,

    /// Whether the last liveness check succeeded.
    #[sea_orm(default_value = false)]
    pub up: bool,

    /// Whether the instance resolves to an IPv6 address.
    #[sea_orm(default_value = false)]
    pub ipv6: bool,

    /// Reported user count, absent until first crawled.
    #[sea_orm(nullable)]
    pub users: Option<i64>,

    /// Reported status count. Stored as a string because upstream APIs
    /// report it that way; parsed when aggregated.
    #[sea_orm(nullable)]
    pub statuses: Option<String>,

    /// Reported peer-connection count.
    #[sea_orm(nullable)]
    pub connections: Option<i64>,

    /// Whether registrations are open.
    #[sea_orm(default_value = false)]
    pub open_registrations: bool,

    /// Marked dead after prolonged unreachability.
    #[sea_orm(default_value = false)]
    pub dead: bool,

    /// Excluded from listings and aggregation by an operator.
    #[sea_orm(default_value = false)]
    pub blacklisted: bool,

    /// Reported software version.
    #[sea_orm(nullable)]
    pub version: Option<String>,

    /// TLS configuration score.
    #[sea_orm(nullable)]
    pub https_score: Option<i32>,

    /// TLS configuration letter grade.
    #[sea_orm(nullable)]
    pub https_rank: Option<String>,

    /// Security observatory score, written only by a finished probe.
    #[sea_orm(nullable)]
    pub obs_score: Option<i32>,

    /// Security observatory letter grade, written only by a finished probe.
    #[sea_orm(nullable)]
    pub obs_rank: Option<String>,

    /// When the observatory was last asked about this instance.
    /// Advances forward only; never rolled back.
    #[sea_orm(nullable)]
    pub latest_obs_check: Option<DateTimeWithTimeZone>,

    /// First time the instance was observed up.
    #[sea_orm(nullable)]
    pub first_uptime: Option<DateTimeWithTimeZone>,

    /// Operator-declared metadata (languages, prohibited content, theme,
    /// descriptions). See `InstanceInfos` in fedidex-core.
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub infos: Option<Json>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::ping::Entity")]
    Pings,
}

impl Related<super::ping::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
