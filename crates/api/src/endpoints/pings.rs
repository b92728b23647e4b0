//! Per-instance ping history endpoint.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use fedidex_common::AppResult;
use fedidex_core::PingHistory;

use crate::middleware::AppState;

/// Latest liveness samples for one instance, newest first.
async fn instance_pings(
    State(state): State<AppState>,
    Path(instance): Path<String>,
) -> AppResult<Json<PingHistory>> {
    let history = state.directory_service.recent_pings(&instance).await?;
    Ok(Json(history))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/{instance}/ping.json", get(instance_pings))
}
