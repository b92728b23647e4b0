//! Observatory health checks over the instance registry.
//!
//! Each instance moves through one check cycle at a time: claim the
//! cooldown window, probe, persist a finished report. The claim is a
//! conditional update, so concurrent schedulers can never run two
//! probes for the same instance inside one window.

use crate::observatory::Observatory;
use fedidex_common::AppResult;
use fedidex_db::repositories::InstanceRepository;
use futures::StreamExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Terminal outcome of one check cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The probe ran. `updated` is true when a finished report was
    /// persisted; false when the scan is still in progress upstream.
    Completed { updated: bool },
    /// The cooldown window is already claimed; nothing was probed.
    Skipped,
}

/// Counters accumulated over one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub updated: u64,
    pub pending: u64,
    pub skipped: u64,
    pub failed: u64,
}

/// Runs observatory checks and persists finished reports.
#[derive(Clone)]
pub struct HealthChecker {
    instance_repo: InstanceRepository,
    observatory: Arc<dyn Observatory>,
    concurrency: usize,
}

impl HealthChecker {
    /// Create a checker probing at most `concurrency` instances at once.
    #[must_use]
    pub fn new(
        instance_repo: InstanceRepository,
        observatory: Arc<dyn Observatory>,
        concurrency: usize,
    ) -> Self {
        Self {
            instance_repo,
            observatory,
            concurrency,
        }
    }

    /// Run one check cycle for the given instance.
    ///
    /// The cooldown claim happens before the probe; a failed probe
    /// leaves the claim in place, so the next attempt waits out the
    /// full window.
    pub async fn check_instance(&self, id: &str) -> AppResult<CheckOutcome> {
        let instance = self.instance_repo.get_by_id(id).await?;

        if !self.instance_repo.claim_observatory_check(&instance.id).await? {
            debug!(instance = %instance.name, "Observatory check still in cooldown");
            return Ok(CheckOutcome::Skipped);
        }

        let report = self.observatory.analyze(&instance.name).await?;

        if report.state.is_finished() {
            self.instance_repo
                .record_observatory_result(&instance.id, report.grade, report.score)
                .await?;
            debug!(instance = %instance.name, "Stored finished observatory report");
            return Ok(CheckOutcome::Completed { updated: true });
        }

        debug!(
            instance = %instance.name,
            state = ?report.state,
            "Observatory scan not finished yet"
        );
        Ok(CheckOutcome::Completed { updated: false })
    }

    /// Check every registered instance with bounded concurrency.
    ///
    /// Per-instance failures are logged and counted; the sweep always
    /// runs to completion.
    pub async fn sweep(&self) -> AppResult<SweepStats> {
        let instances = self.instance_repo.find_all().await?;

        let updated = AtomicU64::new(0);
        let pending = AtomicU64::new(0);
        let skipped = AtomicU64::new(0);
        let failed = AtomicU64::new(0);

        futures::stream::iter(instances)
            .for_each_concurrent(self.concurrency, |instance| {
                let updated = &updated;
                let pending = &pending;
                let skipped = &skipped;
                let failed = &failed;
                async move {
                    match self.check_instance(&instance.id).await {
                        Ok(CheckOutcome::Completed { updated: true }) => {
                            updated.fetch_add(1, Ordering::Relaxed);
                        }
                        Ok(CheckOutcome::Completed { updated: false }) => {
                            pending.fetch_add(1, Ordering::Relaxed);
                        }
                        Ok(CheckOutcome::Skipped) => {
                            skipped.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => {
                            warn!(instance = %instance.name, error = %e, "Observatory check failed");
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            })
            .await;

        Ok(SweepStats {
            updated: updated.into_inner(),
            pending: pending.into_inner(),
            skipped: skipped.into_inner(),
            failed: failed.into_inner(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::observatory::{ObservatoryReport, ObservatoryState};
    use async_trait::async_trait;
    use chrono::Utc;
    use fedidex_common::AppError;
    use fedidex_db::entities::instance;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::atomic::AtomicUsize;

    struct StubObservatory {
        report: ObservatoryReport,
        calls: AtomicUsize,
    }

    impl StubObservatory {
        fn new(state: ObservatoryState, grade: Option<&str>, score: Option<i32>) -> Self {
            Self {
                report: ObservatoryReport {
                    state,
                    grade: grade.map(ToString::to_string),
                    score,
                },
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Observatory for StubObservatory {
        async fn analyze(&self, _host: &str) -> AppResult<ObservatoryReport> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.report.clone())
        }
    }

    struct FailingObservatory;

    #[async_trait]
    impl Observatory for FailingObservatory {
        async fn analyze(&self, host: &str) -> AppResult<ObservatoryReport> {
            Err(AppError::Upstream(format!("connection refused: {host}")))
        }
    }

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
            connections: Some(20),
            open_registrations: true,
            dead: false,
            blacklisted: false,
            version: Some("4.2.0".to_string()),
            https_score: None,
            https_rank: None,
            obs_score: None,
            obs_rank: None,
            latest_obs_check: None,
            first_uptime: None,
            infos: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn exec_ok(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    #[tokio::test]
    async fn test_finished_scan_persists_grade_and_score() {
        let instance = create_test_instance("i1", "social.example");
        let mut stored = instance.clone();
        stored.obs_rank = Some("A+".to_string());
        stored.obs_score = Some(105);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![instance], vec![stored]])
                .append_exec_results([exec_ok(1)])
                .into_connection(),
        );
        let checker = HealthChecker::new(
            InstanceRepository::new(db),
            Arc::new(StubObservatory::new(
                ObservatoryState::Finished,
                Some("A+"),
                Some(105),
            )),
            1,
        );

        let outcome = checker.check_instance("i1").await.unwrap();

        assert_eq!(outcome, CheckOutcome::Completed { updated: true });
    }

    #[tokio::test]
    async fn test_unfinished_scan_writes_nothing() {
        let instance = create_test_instance("i1", "social.example");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![instance]])
                .append_exec_results([exec_ok(1)])
                .into_connection(),
        );
        let checker = HealthChecker::new(
            InstanceRepository::new(db),
            Arc::new(StubObservatory::new(ObservatoryState::Running, None, None)),
            1,
        );

        let outcome = checker.check_instance("i1").await.unwrap();

        assert_eq!(outcome, CheckOutcome::Completed { updated: false });
    }

    #[tokio::test]
    async fn test_lost_claim_skips_without_probing() {
        let instance = create_test_instance("i1", "social.example");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![instance]])
                .append_exec_results([exec_ok(0)])
                .into_connection(),
        );
        let observatory = Arc::new(StubObservatory::new(
            ObservatoryState::Finished,
            Some("A"),
            Some(90),
        ));
        let checker = HealthChecker::new(InstanceRepository::new(db), observatory.clone(), 1);

        let outcome = checker.check_instance("i1").await.unwrap();

        assert_eq!(outcome, CheckOutcome::Skipped);
        assert_eq!(observatory.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_probe_failure_propagates_as_upstream_error() {
        let instance = create_test_instance("i1", "social.example");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![instance]])
                .append_exec_results([exec_ok(1)])
                .into_connection(),
        );
        let checker =
            HealthChecker::new(InstanceRepository::new(db), Arc::new(FailingObservatory), 1);

        let result = checker.check_instance("i1").await;

        assert!(matches!(result, Err(AppError::Upstream(_))));
    }

    #[tokio::test]
    async fn test_unknown_instance_is_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<instance::Model>::new()])
                .into_connection(),
        );
        let checker =
            HealthChecker::new(InstanceRepository::new(db), Arc::new(FailingObservatory), 1);

        let result = checker.check_instance("missing").await;

        assert!(matches!(result, Err(AppError::InstanceNotFound(_))));
    }

    #[tokio::test]
    async fn test_sweep_isolates_per_instance_failures() {
        let a = create_test_instance("i1", "a.example");
        let b = create_test_instance("i2", "b.example");

        // find_all, then one get_by_id per instance; claims succeed, the
        // probe fails for every host. Concurrency 1 keeps the mock
        // result order deterministic.
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([
                    vec![a.clone(), b.clone()],
                    vec![a],
                    vec![b],
                ])
                .append_exec_results([exec_ok(1), exec_ok(1)])
                .into_connection(),
        );
        let checker =
            HealthChecker::new(InstanceRepository::new(db), Arc::new(FailingObservatory), 1);

        let stats = checker.sweep().await.unwrap();

        assert_eq!(stats.failed, 2);
        assert_eq!(stats.updated, 0);
        assert_eq!(stats.skipped, 0);
    }

    #[tokio::test]
    async fn test_sweep_counts_mixed_outcomes() {
        let a = create_test_instance("i1", "a.example");
        let b = create_test_instance("i2", "b.example");

        // First instance wins its claim and finishes; second loses its
        // claim and is skipped.
        let mut stored = a.clone();
        stored.obs_rank = Some("B".to_string());
        stored.obs_score = Some(65);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([
                    vec![a.clone(), b.clone()],
                    vec![a],
                    vec![stored],
                    vec![b],
                ])
                .append_exec_results([exec_ok(1), exec_ok(0)])
                .into_connection(),
        );
        let checker = HealthChecker::new(
            InstanceRepository::new(db),
            Arc::new(StubObservatory::new(
                ObservatoryState::Finished,
                Some("B"),
                Some(65),
            )),
            1,
        );

        let stats = checker.sweep().await.unwrap();

        assert_eq!(stats.updated, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.failed, 0);
    }
}
