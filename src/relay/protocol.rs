//! Relay message envelopes and their NDJSON encoding.
//!
//! CHANGELOG:
//! - 10/16/2026 - Reworked for init/execute/query relay (string errors, opaque ids)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::BindParams;
use crate::error::RelayError;

/// Inbound message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Opaque correlation token, echoed back untouched
    #[serde(default)]
    pub id: Value,
    /// Method name ("init", "execute", "query")
    pub method: String,
    /// Method-specific arguments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
}

/// Outbound message. Exactly one of `result`/`error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Request ID (matches request)
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `execute`/`query` arguments after decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementArgs {
    pub sql: String,
    pub params: BindParams,
}

#[derive(Debug, Default, Deserialize)]
struct RawStatementArgs {
    sql: Option<String>,
    params: Option<Value>,
}

impl Request {
    pub fn new(id: impl Into<Value>, method: impl Into<String>, args: Option<Value>) -> Self {
        Self {
            id: id.into(),
            method: method.into(),
            args,
        }
    }

    /// Parse request from NDJSON line.
    pub fn from_ndjson_line(line: &str) -> Result<Self> {
        serde_json::from_str(line).context("Failed to parse request JSON")
    }

    /// Decode `args` as `{sql, params?}`.
    pub fn statement_args(&self) -> Result<StatementArgs, RelayError> {
        let raw = match &self.args {
            None | Some(Value::Null) => RawStatementArgs::default(),
            Some(args) => RawStatementArgs::deserialize(args)
                .map_err(|e| RelayError::InvalidArguments(e.to_string()))?,
        };

        let sql = raw.sql.ok_or(RelayError::MissingArgument("sql"))?;
        let params = BindParams::from_json(raw.params.as_ref())?;
        Ok(StatementArgs { sql, params })
    }

    /// Serialize request to NDJSON line.
    pub fn to_ndjson_line(&self) -> Result<String> {
        let json = serde_json::to_string(self)?;
        Ok(format!("{}\n", json))
    }
}

impl Response {
    /// Create a success response.
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: Value, message: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(message.into()),
        }
    }

    /// Response for a line that could not be decoded as a request.
    ///
    /// Salvages the `id` when the line is at least a JSON object carrying one.
    pub fn invalid_request(line: &str, err: &anyhow::Error) -> Self {
        let id = serde_json::from_str::<Value>(line)
            .ok()
            .and_then(|v| v.get("id").cloned())
            .unwrap_or(Value::Null);
        Self::error(id, format!("Invalid request: {:#}", err))
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Serialize response to NDJSON line.
    pub fn to_ndjson_line(&self) -> Result<String> {
        let json = serde_json::to_string(self)?;
        Ok(format!("{}\n", json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_request_without_args() {
        let req = Request::from_ndjson_line(r#"{"id":1,"method":"init"}"#).unwrap();
        assert_eq!(req.id, json!(1));
        assert_eq!(req.method, "init");
        assert!(req.args.is_none());
    }

    #[test]
    fn test_parse_request_keeps_opaque_id() {
        let req = Request::from_ndjson_line(r#"{"id":{"seq":9},"method":"query"}"#).unwrap();
        assert_eq!(req.id, json!({"seq": 9}));
    }

    #[test]
    fn test_parse_request_requires_method() {
        assert!(Request::from_ndjson_line(r#"{"id":1}"#).is_err());
    }

    #[test]
    fn test_statement_args() {
        let req = Request::new(
            4,
            "execute",
            Some(json!({"sql": "INSERT INTO t VALUES (?)", "params": [5]})),
        );
        let args = req.statement_args().unwrap();
        assert_eq!(args.sql, "INSERT INTO t VALUES (?)");
        assert!(!args.params.is_empty());
    }

    #[test]
    fn test_statement_args_missing_sql() {
        let req = Request::new(1, "query", None);
        let err = req.statement_args().unwrap_err();
        assert_eq!(err.to_string(), "Missing required argument: sql");
    }

    #[test]
    fn test_statement_args_wrong_type() {
        let req = Request::new(1, "query", Some(json!({"sql": 42})));
        assert_eq!(req.statement_args().unwrap_err().kind(), "invalid_arguments");
    }

    #[test]
    fn test_response_serializes_one_of_result_or_error() {
        let ok = Response::success(json!(1), json!({"success": true}));
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"id": 1, "result": {"success": true}})
        );

        let err = Response::error(json!(2), "Database not initialized");
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({"id": 2, "error": "Database not initialized"})
        );
    }

    #[test]
    fn test_invalid_request_salvages_id() {
        let line = r#"{"id":"abc","method":7}"#;
        let parse_err = Request::from_ndjson_line(line).unwrap_err();
        let resp = Response::invalid_request(line, &parse_err);
        assert_eq!(resp.id, json!("abc"));
        assert!(resp.error.unwrap().starts_with("Invalid request: "));

        let garbage = "not json";
        let parse_err = Request::from_ndjson_line(garbage).unwrap_err();
        assert_eq!(Response::invalid_request(garbage, &parse_err).id, Value::Null);
    }

    #[test]
    fn test_ndjson_line_terminated() {
        let line = Response::success(json!(1), json!(null)).to_ndjson_line().unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
    }
}
