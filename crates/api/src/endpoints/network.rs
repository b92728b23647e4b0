//! Network-wide stats endpoint.

use axum::{Json, Router, extract::State, routing::get};
use fedidex_core::NetworkStats;

use crate::middleware::AppState;

/// The current network totals snapshot.
async fn network_stats(State(state): State<AppState>) -> Json<NetworkStats> {
    Json((*state.network_stats_service.current()).clone())
}

pub fn router() -> Router<AppState> {
    Router::new().route("/network.json", get(network_stats))
}
