//! HTTP API layer for fedidex.
//!
//! Read-only JSON endpoints over the instance registry:
//!
//! - **Discovery**: filtered, scored instance listings
//! - **Legacy ranking**: the original uptime-weighted list
//! - **Export**: the machine-readable feed external tools consume
//! - **Stats**: the network-wide totals snapshot
//! - **Ping history**: recent liveness samples per instance
//!
//! Built on Axum 0.8.

pub mod endpoints;
pub mod middleware;

pub use endpoints::router;
