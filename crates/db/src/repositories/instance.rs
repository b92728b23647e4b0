//! Instance repository: the registry of monitored servers.

use std::sync::Arc;

use chrono::{Duration, Utc};
use fedidex_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::entities::{Instance, instance};

/// How long a successful observatory claim blocks the next one.
pub const OBS_CHECK_COOLDOWN_HOURS: i64 = 24;

/// Instance repository for database operations.
#[derive(Clone)]
pub struct InstanceRepository {
    db: Arc<DatabaseConnection>,
}

impl InstanceRepository {
    /// Create a new instance repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an instance by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<instance::Model>> {
        Instance::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get an instance by ID, or error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<instance::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::InstanceNotFound(id.to_string()))
    }

    /// Find an instance by hostname.
    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<instance::Model>> {
        Instance::find()
            .filter(instance::Column::Name.eq(name.to_lowercase()))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get an instance by hostname, or error if not found.
    pub async fn get_by_name(&self, name: &str) -> AppResult<instance::Model> {
        self.find_by_name(name)
            .await?
            .ok_or_else(|| AppError::InstanceNotFound(name.to_string()))
    }

    /// List every registered instance, oldest first.
    pub async fn find_all(&self) -> AppResult<Vec<instance::Model>> {
        Instance::find()
            .order_by_asc(instance::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Instances that count toward network totals: seen up at least once,
    /// not dead, not blacklisted.
    pub async fn find_active(&self) -> AppResult<Vec<instance::Model>> {
        Instance::find()
            .filter(instance::Column::UptimeAll.gt(0.0))
            .filter(instance::Column::Dead.eq(false))
            .filter(instance::Column::Blacklisted.eq(false))
            .order_by_asc(instance::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Active instances that also have a recorded first uptime, as ranked
    /// by the legacy listing.
    pub async fn find_established(&self) -> AppResult<Vec<instance::Model>> {
        Instance::find()
            .filter(instance::Column::UptimeAll.gt(0.0))
            .filter(instance::Column::Dead.eq(false))
            .filter(instance::Column::Blacklisted.eq(false))
            .filter(instance::Column::FirstUptime.is_not_null())
            .order_by_asc(instance::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Instances eligible for a discovery listing. All of: some recent
    /// uptime, not blacklisted, not dead, a known user count, a known
    /// version. With `require_open`, additionally currently up with open
    /// registrations.
    pub async fn find_discoverable(&self, require_open: bool) -> AppResult<Vec<instance::Model>> {
        let mut query = Instance::find()
            .filter(instance::Column::Uptime.gt(0.0))
            .filter(instance::Column::Blacklisted.eq(false))
            .filter(instance::Column::Dead.eq(false))
            .filter(instance::Column::Users.is_not_null())
            .filter(instance::Column::Version.is_not_null());

        if require_open {
            query = query
                .filter(instance::Column::Up.eq(true))
                .filter(instance::Column::OpenRegistrations.eq(true));
        }

        query
            .order_by_asc(instance::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Instances worth running liveness checks against.
    pub async fn find_checkable(&self) -> AppResult<Vec<instance::Model>> {
        Instance::find()
            .filter(instance::Column::Dead.eq(false))
            .filter(instance::Column::Blacklisted.eq(false))
            .order_by_asc(instance::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new instance.
    pub async fn create(&self, model: instance::ActiveModel) -> AppResult<instance::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update an instance.
    pub async fn update(&self, model: instance::ActiveModel) -> AppResult<instance::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Atomically claim the observatory cooldown window for an instance.
    ///
    /// Advances `latest_obs_check` to now if and only if it is unset or
    /// older than the cooldown. Returns whether this caller won the claim;
    /// a `false` means another in-flight check holds the window (or the
    /// cooldown is still active) and the caller must not probe.
    pub async fn claim_observatory_check(&self, id: &str) -> AppResult<bool> {
        use sea_orm::sea_query::Expr;

        let now = Utc::now();
        let cutoff = now - Duration::hours(OBS_CHECK_COOLDOWN_HOURS);

        let result = Instance::update_many()
            .col_expr(instance::Column::LatestObsCheck, Expr::value(now))
            .filter(instance::Column::Id.eq(id))
            .filter(
                Condition::any()
                    .add(instance::Column::LatestObsCheck.is_null())
                    .add(instance::Column::LatestObsCheck.lte(cutoff)),
            )
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected == 1)
    }

    /// Persist the grade and score of a finished observatory probe.
    pub async fn record_observatory_result(
        &self,
        id: &str,
        grade: Option<String>,
        score: Option<i32>,
    ) -> AppResult<instance::Model> {
        let now = Utc::now().fixed_offset();

        let model = instance::ActiveModel {
            id: Set(id.to_string()),
            obs_rank: Set(grade),
            obs_score: Set(score),
            updated_at: Set(Some(now)),
            ..Default::default()
        };

        self.update(model).await
    }

    /// Persist the outcome of a liveness check. `first_uptime` is only
    /// written when the caller observed the first successful check.
    pub async fn update_liveness(
        &self,
        id: &str,
        up: bool,
        ipv6: bool,
        uptime: f64,
        uptime_all: f64,
        first_uptime: Option<chrono::DateTime<chrono::FixedOffset>>,
    ) -> AppResult<instance::Model> {
        let now = Utc::now().fixed_offset();

        let mut model = instance::ActiveModel {
            id: Set(id.to_string()),
            up: Set(up),
            ipv6: Set(ipv6),
            uptime: Set(uptime),
            uptime_all: Set(uptime_all),
            updated_at: Set(Some(now)),
            ..Default::default()
        };

        if let Some(ts) = first_uptime {
            model.first_uptime = Set(Some(ts));
        }

        self.update(model).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_instance(id: &str, name: &str) -> instance::Model {
        instance::Model {
            id: id.to_string(),
            name: name.to_string(),
            title: None,
            short_description: None,
            description: None,
            uptime: 0.99,
            uptime_all: 0.97,
            up: true,
            ipv6: false,
            users: Some(100),
            statuses: Some("5000".to_string()),
            connections: Some(200),
            open_registrations: true,
            dead: false,
            blacklisted: false,
            version: Some("4.2.0".to_string()),
            https_score: Some(100),
            https_rank: Some("A+".to_string()),
            obs_score: None,
            obs_rank: None,
            latest_obs_check: None,
            first_uptime: Some(Utc::now().into()),
            infos: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_name() {
        let model = create_test_instance("i1", "mastodon.example");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[model.clone()]])
                .into_connection(),
        );

        let repo = InstanceRepository::new(db);
        let result = repo.find_by_name("mastodon.example").await.unwrap();

        assert!(result.is_some());
        assert_eq!(result.unwrap().name, "mastodon.example");
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<instance::Model>::new()])
                .into_connection(),
        );

        let repo = InstanceRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::InstanceNotFound(_))));
    }

    #[tokio::test]
    async fn test_claim_observatory_check_won() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = InstanceRepository::new(db);
        assert!(repo.claim_observatory_check("i1").await.unwrap());
    }

    #[tokio::test]
    async fn test_claim_observatory_check_lost() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = InstanceRepository::new(db);
        assert!(!repo.claim_observatory_check("i1").await.unwrap());
    }

    #[tokio::test]
    async fn test_find_active() {
        let a = create_test_instance("i1", "a.example");
        let b = create_test_instance("i2", "b.example");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[a, b]])
                .into_connection(),
        );

        let repo = InstanceRepository::new(db);
        let result = repo.find_active().await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].name, "a.example");
    }
}
