//! Embedded database: owned in-memory handle plus value conversions.
//!
//! CHANGELOG:
//! - 10/16/2026 - Replaced Messages.db access with in-memory relay database

pub mod connection;
pub mod values;

pub use connection::{Database, DatabaseSlot};
pub use values::{BindParams, ResultSet};
