//! Command relay: protocol, service, worker thread and transports.
//!
//! CHANGELOG:
//! - 10/16/2026 - Split worker out of the server; renamed from daemon

pub mod protocol;
pub mod server;
pub mod service;
pub mod worker;

pub use protocol::{Request, Response};
pub use service::RelayService;
pub use worker::{RelayHandle, RelayMessage, RelayWorker};
