//! Instance monitoring for fedidex.
//!
//! Feeds the registry the measurements the directory ranks on:
//!
//! - **Observatory checks**: external security scans behind a cooldown
//!   claim, so one instance is probed at most once per window
//! - **Liveness sampling**: HTTPS reachability, IPv6 support, and the
//!   uptime fractions derived from the ping history
//! - **Scheduler**: periodic sweeps with bounded concurrency and
//!   graceful shutdown

pub mod health_check;
pub mod liveness;
pub mod observatory;
pub mod scheduler;

pub use health_check::{CheckOutcome, HealthChecker, SweepStats};
pub use liveness::{LivenessChecker, LivenessStats};
pub use observatory::{Observatory, ObservatoryClient, ObservatoryReport, ObservatoryState};
pub use scheduler::{MonitorExecutor, MonitorService, SchedulerConfig, spawn_monitor_loops};
