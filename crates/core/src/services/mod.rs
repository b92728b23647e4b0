//! Business logic services.

#![allow(missing_docs)]

pub mod directory;
pub mod network_stats;

pub use directory::{
    DirectoryService, ExportedInstance, InstanceInfos, LegacyListResponse, ListCriteria,
    ListResponse, ListedInstance, PingEntry, PingHistory, ProbeEntry, RankedInstance,
};
pub use network_stats::{NetworkStats, NetworkStatsService};
