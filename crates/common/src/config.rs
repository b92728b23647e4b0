//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Monitoring configuration.
    #[serde(default)]
    pub monitor: MonitorConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Base URL of the external security observatory API.
    #[serde(default = "default_observatory_url")]
    pub observatory_url: String,
    /// Interval between observatory sweeps, in seconds.
    #[serde(default = "default_observatory_interval")]
    pub observatory_interval_secs: u64,
    /// Interval between liveness sweeps, in seconds.
    #[serde(default = "default_liveness_interval")]
    pub liveness_interval_secs: u64,
    /// Interval between network stats refreshes, in seconds.
    #[serde(default = "default_stats_interval")]
    pub stats_interval_secs: u64,
    /// Maximum number of in-flight probes during a sweep.
    #[serde(default = "default_probe_concurrency")]
    pub probe_concurrency: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            observatory_url: default_observatory_url(),
            observatory_interval_secs: default_observatory_interval(),
            liveness_interval_secs: default_liveness_interval(),
            stats_interval_secs: default_stats_interval(),
            probe_concurrency: default_probe_concurrency(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

fn default_observatory_url() -> String {
    "https://http-observatory.security.mozilla.org/api/v1".to_string()
}

const fn default_observatory_interval() -> u64 {
    3600
}

const fn default_liveness_interval() -> u64 {
    300
}

const fn default_stats_interval() -> u64 {
    300
}

const fn default_probe_concurrency() -> usize {
    4
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `FEDIDEX_ENV`)
    /// 3. Environment variables with `FEDIDEX_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("FEDIDEX_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("FEDIDEX")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("FEDIDEX")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
