//! Core business logic for fedidex.

pub mod services;

pub use services::*;
