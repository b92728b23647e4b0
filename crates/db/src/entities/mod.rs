//! Database entities.

pub mod instance;
pub mod ping;
pub mod probe;

pub use instance::Entity as Instance;
pub use ping::Entity as Ping;
pub use probe::Entity as Probe;
