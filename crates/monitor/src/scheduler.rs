//! Periodic monitor loops with graceful shutdown.

#![allow(missing_docs)]

use crate::health_check::HealthChecker;
use crate::liveness::LivenessChecker;
use fedidex_common::AppResult;
use fedidex_common::config::MonitorConfig;
use fedidex_core::NetworkStatsService;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::interval;

/// Cadence settings for the monitor loops.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Interval between observatory sweeps (default: 1 hour).
    pub observatory_interval: Duration,
    /// Interval between liveness sweeps (default: 5 minutes).
    pub liveness_interval: Duration,
    /// Interval between network stats refreshes (default: 5 minutes).
    pub stats_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            observatory_interval: Duration::from_secs(3600),
            liveness_interval: Duration::from_secs(300),
            stats_interval: Duration::from_secs(300),
        }
    }
}

impl SchedulerConfig {
    /// Build from the monitor section of the app config.
    #[must_use]
    pub const fn from_config(config: &MonitorConfig) -> Self {
        Self {
            observatory_interval: Duration::from_secs(config.observatory_interval_secs),
            liveness_interval: Duration::from_secs(config.liveness_interval_secs),
            stats_interval: Duration::from_secs(config.stats_interval_secs),
        }
    }
}

/// The work a scheduler tick triggers.
#[async_trait::async_trait]
pub trait MonitorExecutor: Send + Sync {
    /// Run one observatory sweep over the registry.
    async fn observatory_sweep(&self) -> AppResult<()>;

    /// Run one liveness sweep over the registry.
    async fn liveness_sweep(&self) -> AppResult<()>;

    /// Recompute the network stats snapshot.
    async fn refresh_stats(&self) -> AppResult<()>;
}

/// Production executor wiring the checkers and the stats aggregator.
pub struct MonitorService {
    health: HealthChecker,
    liveness: LivenessChecker,
    stats: NetworkStatsService,
}

impl MonitorService {
    /// Create the executor.
    #[must_use]
    pub const fn new(
        health: HealthChecker,
        liveness: LivenessChecker,
        stats: NetworkStatsService,
    ) -> Self {
        Self {
            health,
            liveness,
            stats,
        }
    }
}

#[async_trait::async_trait]
impl MonitorExecutor for MonitorService {
    async fn observatory_sweep(&self) -> AppResult<()> {
        let stats = self.health.sweep().await?;
        tracing::info!(
            updated = stats.updated,
            pending = stats.pending,
            skipped = stats.skipped,
            failed = stats.failed,
            "Observatory sweep complete"
        );
        Ok(())
    }

    async fn liveness_sweep(&self) -> AppResult<()> {
        let stats = self.liveness.sweep().await?;
        tracing::info!(
            up = stats.up,
            down = stats.down,
            failed = stats.failed,
            "Liveness sweep complete"
        );
        Ok(())
    }

    async fn refresh_stats(&self) -> AppResult<()> {
        self.stats.refresh().await
    }
}

/// Spawn the monitor loops.
///
/// Each loop ticks immediately, then on its interval, and exits at the
/// next select point once the shutdown flag flips. An in-progress sweep
/// always runs to completion before its loop ends.
pub fn spawn_monitor_loops<E: MonitorExecutor + 'static>(
    config: &SchedulerConfig,
    executor: Arc<E>,
    shutdown: &watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::new();

    // Observatory sweep loop
    {
        let executor = executor.clone();
        let mut shutdown = shutdown.clone();
        let period = config.observatory_interval;
        handles.push(tokio::spawn(async move {
            let mut tick = interval(period);
            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        if let Err(e) = executor.observatory_sweep().await {
                            tracing::error!(error = %e, "Observatory sweep failed");
                        }
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("Observatory loop stopping");
                        break;
                    }
                }
            }
        }));
    }

    // Liveness sweep loop
    {
        let executor = executor.clone();
        let mut shutdown = shutdown.clone();
        let period = config.liveness_interval;
        handles.push(tokio::spawn(async move {
            let mut tick = interval(period);
            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        if let Err(e) = executor.liveness_sweep().await {
                            tracing::error!(error = %e, "Liveness sweep failed");
                        }
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("Liveness loop stopping");
                        break;
                    }
                }
            }
        }));
    }

    // Network stats refresh loop
    {
        let executor = executor;
        let mut shutdown = shutdown.clone();
        let period = config.stats_interval;
        handles.push(tokio::spawn(async move {
            let mut tick = interval(period);
            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        if let Err(e) = executor.refresh_stats().await {
                            tracing::error!(error = %e, "Network stats refresh failed");
                        }
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("Network stats loop stopping");
                        break;
                    }
                }
            }
        }));
    }

    handles
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingExecutor {
        observatory: AtomicUsize,
        liveness: AtomicUsize,
        stats: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl MonitorExecutor for CountingExecutor {
        async fn observatory_sweep(&self) -> AppResult<()> {
            self.observatory.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn liveness_sweep(&self) -> AppResult<()> {
            self.liveness.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn refresh_stats(&self) -> AppResult<()> {
            self.stats.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_scheduler_config_default() {
        let config = SchedulerConfig::default();
        assert_eq!(config.observatory_interval, Duration::from_secs(3600));
        assert_eq!(config.liveness_interval, Duration::from_secs(300));
        assert_eq!(config.stats_interval, Duration::from_secs(300));
    }

    #[test]
    fn test_scheduler_config_from_monitor_config() {
        let monitor = MonitorConfig {
            observatory_interval_secs: 60,
            liveness_interval_secs: 30,
            stats_interval_secs: 10,
            ..Default::default()
        };

        let config = SchedulerConfig::from_config(&monitor);

        assert_eq!(config.observatory_interval, Duration::from_secs(60));
        assert_eq!(config.liveness_interval, Duration::from_secs(30));
        assert_eq!(config.stats_interval, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_loops_tick_eagerly_and_stop_on_shutdown() {
        let executor = Arc::new(CountingExecutor::default());
        let (tx, rx) = watch::channel(false);
        let config = SchedulerConfig {
            observatory_interval: Duration::from_millis(5),
            liveness_interval: Duration::from_millis(5),
            stats_interval: Duration::from_millis(5),
        };

        let handles = spawn_monitor_loops(&config, executor.clone(), &rx);
        tokio::time::sleep(Duration::from_millis(25)).await;
        tx.send(true).unwrap();
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(executor.observatory.load(Ordering::SeqCst) >= 1);
        assert!(executor.liveness.load(Ordering::SeqCst) >= 1);
        assert!(executor.stats.load(Ordering::SeqCst) >= 1);
    }
}
