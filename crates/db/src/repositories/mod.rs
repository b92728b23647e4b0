//! Database repositories.

pub mod instance;
pub mod ping;

pub use instance::{InstanceRepository, OBS_CHECK_COOLDOWN_HOURS};
pub use ping::{NewProbe, PingRepository};
