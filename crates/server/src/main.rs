//! fedidex server binary.
//!
//! Wires the registry, the directory services, the monitor loops, and
//! the HTTP API into one process.

use std::net::SocketAddr;
use std::sync::Arc;

use fedidex_api::middleware::AppState;
use fedidex_common::Config;
use fedidex_core::{DirectoryService, NetworkStatsService};
use fedidex_db::repositories::{InstanceRepository, PingRepository};
use fedidex_monitor::{
    HealthChecker, LivenessChecker, MonitorService, ObservatoryClient, SchedulerConfig,
    spawn_monitor_loops,
};
use tokio::signal;
use tokio::sync::watch;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fedidex=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting fedidex server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database
    let db = Arc::new(fedidex_db::init(&config).await?);
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    fedidex_db::migrate(&db).await?;
    info!("Migrations completed");

    // Repositories
    let instance_repo = InstanceRepository::new(Arc::clone(&db));
    let ping_repo = PingRepository::new(Arc::clone(&db));

    // Services
    let directory_service = DirectoryService::new(instance_repo.clone(), ping_repo.clone());
    let network_stats_service = NetworkStatsService::new(instance_repo.clone());

    // Monitoring
    let observatory = Arc::new(ObservatoryClient::new(&config.monitor.observatory_url));
    let health_checker = HealthChecker::new(
        instance_repo.clone(),
        observatory,
        config.monitor.probe_concurrency,
    );
    let liveness_checker =
        LivenessChecker::new(instance_repo, ping_repo, config.monitor.probe_concurrency);
    let monitor = Arc::new(MonitorService::new(
        health_checker,
        liveness_checker,
        network_stats_service.clone(),
    ));

    // A signal flips the watch; the monitor loops and the HTTP server
    // both drain on it.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let monitor_handles = spawn_monitor_loops(
        &SchedulerConfig::from_config(&config.monitor),
        monitor,
        &shutdown_rx,
    );
    info!("Monitor loops started");

    let state = AppState {
        directory_service,
        network_stats_service,
    };

    let app = fedidex_api::router()
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    let mut server_shutdown = shutdown_rx;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = server_shutdown.changed().await;
        })
        .await?;

    // Let in-flight sweeps finish before exiting.
    for handle in monitor_handles {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Monitor task failed");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}
