//! Liveness sampling: HTTPS reachability, IPv6 support, and the uptime
//! fractions derived from the ping history.

use chrono::Utc;
use fedidex_common::AppResult;
use fedidex_db::entities::instance;
use fedidex_db::repositories::{InstanceRepository, NewProbe, PingRepository};
use futures::StreamExt;
use reqwest::Client;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Trailing window for the short-term uptime fraction, in days.
const UPTIME_WINDOW_DAYS: i64 = 7;

/// Raw measurements from probing one instance.
#[derive(Debug, Clone)]
struct ProbeSample {
    up: bool,
    latency_ms: Option<i32>,
    https_detail: Option<String>,
    ipv6: bool,
    ipv6_detail: Option<String>,
}

/// Counters accumulated over one liveness sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LivenessStats {
    pub up: u64,
    pub down: u64,
    pub failed: u64,
}

/// Probes instances over HTTPS and records the samples.
#[derive(Clone)]
pub struct LivenessChecker {
    instance_repo: InstanceRepository,
    ping_repo: PingRepository,
    client: Client,
    user_agent: String,
    concurrency: usize,
}

impl LivenessChecker {
    /// Create a checker probing at most `concurrency` instances at once.
    #[must_use]
    #[allow(clippy::expect_used)] // Client build only fails with incompatible TLS settings
    pub fn new(
        instance_repo: InstanceRepository,
        ping_repo: PingRepository,
        concurrency: usize,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            instance_repo,
            ping_repo,
            client,
            user_agent: format!("fedidex/{} (+https://fedidex.example)", env!("CARGO_PKG_VERSION")),
            concurrency,
        }
    }

    /// Probe one instance and record the sample.
    ///
    /// Returns whether the instance answered. `first_uptime` is written
    /// exactly once, on the first successful sample.
    pub async fn check_instance(&self, instance: &instance::Model) -> AppResult<bool> {
        let sample = self.probe(&instance.name).await;
        self.record(instance, sample).await
    }

    /// Probe every live-checkable instance with bounded concurrency.
    pub async fn sweep(&self) -> AppResult<LivenessStats> {
        let instances = self.instance_repo.find_checkable().await?;

        let up = AtomicU64::new(0);
        let down = AtomicU64::new(0);
        let failed = AtomicU64::new(0);

        futures::stream::iter(instances)
            .for_each_concurrent(self.concurrency, |instance| {
                let up = &up;
                let down = &down;
                let failed = &failed;
                async move {
                    match self.check_instance(&instance).await {
                        Ok(true) => {
                            up.fetch_add(1, Ordering::Relaxed);
                        }
                        Ok(false) => {
                            down.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => {
                            warn!(instance = %instance.name, error = %e, "Liveness check failed");
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            })
            .await;

        Ok(LivenessStats {
            up: up.into_inner(),
            down: down.into_inner(),
            failed: failed.into_inner(),
        })
    }

    async fn probe(&self, name: &str) -> ProbeSample {
        let url = format!("https://{name}/");
        let started = Instant::now();

        let (up, latency_ms, https_detail) = match self
            .client
            .get(&url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
        {
            Ok(response) => {
                let latency = started.elapsed().as_millis() as i32;
                let status = response.status();
                if status.is_success() {
                    (true, Some(latency), None)
                } else {
                    (false, Some(latency), Some(format!("status {status}")))
                }
            }
            Err(e) => (false, None, Some(e.to_string())),
        };

        let (ipv6, ipv6_detail) = match tokio::net::lookup_host((name, 443)).await {
            Ok(mut addrs) => match addrs.find(std::net::SocketAddr::is_ipv6) {
                Some(addr) => (true, Some(addr.ip().to_string())),
                None => (false, None),
            },
            Err(e) => (false, Some(e.to_string())),
        };

        debug!(host = %name, up, ipv6, latency_ms = ?latency_ms, "Probed instance");

        ProbeSample {
            up,
            latency_ms,
            https_detail,
            ipv6,
            ipv6_detail,
        }
    }

    async fn record(&self, instance: &instance::Model, sample: ProbeSample) -> AppResult<bool> {
        let probes = vec![
            NewProbe {
                kind: "https".to_string(),
                success: sample.up,
                detail: sample.https_detail,
                latency_ms: sample.latency_ms,
            },
            NewProbe {
                kind: "ipv6".to_string(),
                success: sample.ipv6,
                detail: sample.ipv6_detail,
                latency_ms: None,
            },
        ];

        self.ping_repo
            .create_with_probes(&instance.id, sample.up, sample.latency_ms, probes)
            .await?;

        let window_start = Utc::now().fixed_offset() - chrono::Duration::days(UPTIME_WINDOW_DAYS);
        let (recent_up, recent_total) = self
            .ping_repo
            .uptime_counts(&instance.id, Some(window_start))
            .await?;
        let (lifetime_up, lifetime_total) =
            self.ping_repo.uptime_counts(&instance.id, None).await?;

        let first_uptime = (sample.up && instance.first_uptime.is_none())
            .then(|| Utc::now().fixed_offset());

        self.instance_repo
            .update_liveness(
                &instance.id,
                sample.up,
                sample.ipv6,
                uptime_fraction(recent_up, recent_total),
                uptime_fraction(lifetime_up, lifetime_total),
                first_uptime,
            )
            .await?;

        Ok(sample.up)
    }
}

/// Fraction of successful pings, 0 when no pings exist yet.
fn uptime_fraction(up: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        up as f64 / total as f64
    }
}
