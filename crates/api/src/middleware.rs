//! Shared application state for the HTTP layer.

use fedidex_core::{DirectoryService, NetworkStatsService};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub directory_service: DirectoryService,
    pub network_stats_service: NetworkStatsService,
}
