//! sqlite-relay library
//!
//! Relays `init` / `execute` / `query` messages to an in-memory SQLite
//! database owned by a background worker.
//!
//! CHANGELOG:
//! - 10/16/2026 - Relay modules replace the iMessage CLI modules

pub mod config;
pub mod db;
pub mod error;
pub mod relay;

pub use config::RelayConfig;
pub use error::RelayError;
pub use relay::{Request, Response};
