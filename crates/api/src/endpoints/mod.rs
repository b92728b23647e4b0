//! API endpoints.

mod directory;
mod network;
mod pings;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(directory::router())
        .merge(network::router())
        .merge(pings::router())
}
