//! Relay service - dispatches requests against the owned database slot.
//!
//! CHANGELOG:
//! - 10/16/2026 - Replaced iMessage handlers with init/execute/query

use serde_json::{json, Value};

use crate::db::DatabaseSlot;
use crate::error::{RelayError, Result};
use crate::relay::protocol::{Request, Response};

/// Command relay. Uninitialized until `init` fills the slot.
#[derive(Default)]
pub struct RelayService {
    slot: DatabaseSlot,
}

impl RelayService {
    /// Relay with an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Relay over a caller-provided slot (possibly already open).
    pub fn with_slot(slot: DatabaseSlot) -> Self {
        Self { slot }
    }

    pub fn is_initialized(&self) -> bool {
        self.slot.is_open()
    }

    /// Handle one request, always producing a response with the same id.
    pub fn handle(&mut self, request: Request) -> Response {
        match self.dispatch(&request) {
            Ok(result) => {
                tracing::debug!(id = %request.id, method = %request.method, "request ok");
                Response::success(request.id, result)
            }
            Err(e) => {
                tracing::warn!(
                    id = %request.id,
                    method = %request.method,
                    kind = e.kind(),
                    error = %e,
                    "request failed"
                );
                Response::error(request.id, e.to_string())
            }
        }
    }

    /// Dispatch request to appropriate handler.
    pub fn dispatch(&mut self, request: &Request) -> Result<Value> {
        match request.method.as_str() {
            "init" => self.init(),
            "execute" => self.execute(request),
            "query" => self.query(request),
            other => Err(RelayError::UnknownMethod(other.to_string())),
        }
    }

    /// Dispose of the database, returning to the uninitialized state.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.slot.close()? {
            tracing::info!("database closed");
        }
        Ok(())
    }

    /// Fresh in-memory database, replacing any previous one.
    fn init(&mut self) -> Result<Value> {
        let replaced = self.slot.open()?;
        tracing::info!(replaced, "database initialized");
        Ok(json!({ "success": true }))
    }

    /// Non-query statement. Args: sql, params (optional)
    fn execute(&self, request: &Request) -> Result<Value> {
        let db = self.slot.get()?;
        let args = request.statement_args()?;
        db.run(&args.sql, &args.params)?;
        Ok(json!({ "success": true }))
    }

    /// Read statement(s). Args: sql, params (optional)
    fn query(&self, request: &Request) -> Result<Value> {
        let db = self.slot.get()?;
        let args = request.statement_args()?;
        let data = db.exec(&args.sql, &args.params)?;
        Ok(json!({ "data": data }))
    }
}
