//! Network-wide totals, recomputed on a fixed cadence and served from an
//! in-memory snapshot so the stats endpoint never waits on the database.

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use fedidex_db::repositories::InstanceRepository;
use serde::Serialize;
use std::sync::Arc;

/// Aggregated totals over all active instances.
#[derive(Debug, Clone, Serialize)]
pub struct NetworkStats {
    pub users: i64,
    pub statuses: i64,
    pub connections: i64,
    #[serde(rename = "instances")]
    pub instance_count: u64,
    #[serde(rename = "computedAt")]
    pub computed_at: DateTime<Utc>,
}

impl NetworkStats {
    fn zeroed() -> Self {
        Self {
            users: 0,
            statuses: 0,
            connections: 0,
            instance_count: 0,
            computed_at: Utc::now(),
        }
    }
}

/// Holds the latest [`NetworkStats`] snapshot and recomputes it on demand.
///
/// Readers always get the last successfully computed snapshot; a failed
/// refresh leaves it untouched.
#[derive(Clone)]
pub struct NetworkStatsService {
    instance_repo: InstanceRepository,
    snapshot: Arc<ArcSwap<NetworkStats>>,
}

impl NetworkStatsService {
    /// Create the service with a zeroed snapshot. Callers should refresh
    /// once at startup so readers see real totals immediately.
    #[must_use]
    pub fn new(instance_repo: InstanceRepository) -> Self {
        Self {
            instance_repo,
            snapshot: Arc::new(ArcSwap::from_pointee(NetworkStats::zeroed())),
        }
    }

    /// The current snapshot.
    #[must_use]
    pub fn current(&self) -> Arc<NetworkStats> {
        self.snapshot.load_full()
    }

    /// Recompute the totals from the registry and publish them.
    ///
    /// Instances are counted whenever they are active; their individual
    /// counters only contribute when present and non-zero. Status counts
    /// arrive as strings and are skipped when they do not parse.
    pub async fn refresh(&self) -> fedidex_common::AppResult<()> {
        let rows = self.instance_repo.find_active().await?;

        let mut users = 0;
        let mut statuses = 0;
        let mut connections = 0;
        let instance_count = rows.len() as u64;

        for row in &rows {
            if let Some(n) = row.users {
                if n != 0 {
                    users += n;
                }
            }
            if let Some(n) = row.statuses.as_deref().and_then(|s| s.parse::<i64>().ok()) {
                statuses += n;
            }
            if let Some(n) = row.connections {
                if n != 0 {
                    connections += n;
                }
            }
        }

        let stats = NetworkStats {
            users,
            statuses,
            connections,
            instance_count,
            computed_at: Utc::now(),
        };
        tracing::debug!(
            users = stats.users,
            statuses = stats.statuses,
            connections = stats.connections,
            instances = stats.instance_count,
            "refreshed network stats"
        );
        self.snapshot.store(Arc::new(stats));

        Ok(())
    }
}
