//! Ping repository: liveness samples and their probes.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use fedidex_common::{AppError, AppResult, IdGenerator};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::entities::{Ping, Probe, ping, probe};

/// A measurement to record alongside a new ping.
#[derive(Debug, Clone)]
pub struct NewProbe {
    /// Measurement kind ("https", "ipv6").
    pub kind: String,
    /// Whether the measurement succeeded.
    pub success: bool,
    /// Failure detail or extra context.
    pub detail: Option<String>,
    /// Duration of the measurement, when it completed.
    pub latency_ms: Option<i32>,
}

/// Ping repository for database operations.
#[derive(Clone)]
pub struct PingRepository {
    db: Arc<DatabaseConnection>,
    id_gen: IdGenerator,
}

impl PingRepository {
    /// Create a new ping repository.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            id_gen: IdGenerator::new(),
        }
    }

    /// Record one liveness sample and its measurements.
    pub async fn create_with_probes(
        &self,
        instance_id: &str,
        up: bool,
        latency_ms: Option<i32>,
        probes: Vec<NewProbe>,
    ) -> AppResult<ping::Model> {
        let now = Utc::now().fixed_offset();
        let ping_id = self.id_gen.generate();

        let model = ping::ActiveModel {
            id: Set(ping_id.clone()),
            instance_id: Set(instance_id.to_string()),
            up: Set(up),
            latency_ms: Set(latency_ms),
            created_at: Set(now),
        };

        let inserted = model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if !probes.is_empty() {
            let models = probes.into_iter().map(|p| probe::ActiveModel {
                id: Set(self.id_gen.generate()),
                ping_id: Set(ping_id.clone()),
                kind: Set(p.kind),
                success: Set(p.success),
                detail: Set(p.detail),
                latency_ms: Set(p.latency_ms),
                created_at: Set(now),
            });

            Probe::insert_many(models)
                .exec(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        Ok(inserted)
    }

    /// Latest `limit` pings for an instance, newest first, each with its
    /// probes.
    pub async fn find_recent_with_probes(
        &self,
        instance_id: &str,
        limit: u64,
    ) -> AppResult<Vec<(ping::Model, Vec<probe::Model>)>> {
        let pings = Ping::find()
            .filter(ping::Column::InstanceId.eq(instance_id))
            .order_by_desc(ping::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if pings.is_empty() {
            return Ok(Vec::new());
        }

        let ping_ids: Vec<String> = pings.iter().map(|p| p.id.clone()).collect();
        let probes = Probe::find()
            .filter(probe::Column::PingId.is_in(ping_ids))
            .order_by_asc(probe::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut by_ping: HashMap<String, Vec<probe::Model>> = HashMap::new();
        for p in probes {
            by_ping.entry(p.ping_id.clone()).or_default().push(p);
        }

        Ok(pings
            .into_iter()
            .map(|p| {
                let probes = by_ping.remove(&p.id).unwrap_or_default();
                (p, probes)
            })
            .collect())
    }

    /// Count (successful, total) pings for an instance, optionally only
    /// those after `since`.
    pub async fn uptime_counts(
        &self,
        instance_id: &str,
        since: Option<chrono::DateTime<chrono::FixedOffset>>,
    ) -> AppResult<(u64, u64)> {
        let mut total_query = Ping::find().filter(ping::Column::InstanceId.eq(instance_id));
        let mut up_query = Ping::find()
            .filter(ping::Column::InstanceId.eq(instance_id))
            .filter(ping::Column::Up.eq(true));

        if let Some(cutoff) = since {
            total_query = total_query.filter(ping::Column::CreatedAt.gte(cutoff));
            up_query = up_query.filter(ping::Column::CreatedAt.gte(cutoff));
        }

        let total = total_query
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        let up = up_query
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok((up, total))
    }
}
