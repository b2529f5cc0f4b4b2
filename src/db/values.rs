//! Conversions between JSON message values and SQLite values.
//!
//! Inbound: `params` (array or object) become bind values.
//! Outbound: rows become result sets in `{columns, values}` form.
//!
//! CHANGELOG:
//! - 10/16/2026 - Initial implementation

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::Statement;
use serde::Serialize;
use serde_json::Value;

use crate::error::{RelayError, Result};

// ============================================================================
// Bind Values
// ============================================================================

/// Bind values for one statement.
#[derive(Debug, Clone, PartialEq)]
pub enum BindParams {
    /// `[1, "a"]` bound to `?1`, `?2`, ...
    Positional(Vec<SqlValue>),
    /// `{":id": 1}` bound by parameter name (prefix included)
    Named(Vec<(String, SqlValue)>),
}

impl Default for BindParams {
    fn default() -> Self {
        BindParams::Positional(Vec::new())
    }
}

impl BindParams {
    /// Decode the optional `params` argument. Absent or `null` means no values.
    pub fn from_json(params: Option<&Value>) -> Result<Self> {
        match params {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(Value::Array(items)) => items
                .iter()
                .map(to_sql_value)
                .collect::<Result<Vec<_>>>()
                .map(BindParams::Positional),
            Some(Value::Object(map)) => map
                .iter()
                .map(|(name, value)| Ok((name.clone(), to_sql_value(value)?)))
                .collect::<Result<Vec<_>>>()
                .map(BindParams::Named),
            Some(other) => Err(RelayError::InvalidArguments(format!(
                "params must be an array or an object, got {}",
                json_type_name(other)
            ))),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            BindParams::Positional(values) => values.is_empty(),
            BindParams::Named(values) => values.is_empty(),
        }
    }

    /// Bind onto a prepared statement.
    ///
    /// Positional values past the statement's placeholder count fail in the
    /// engine. Names the statement does not use are skipped.
    pub fn bind(&self, stmt: &mut Statement<'_>) -> Result<()> {
        match self {
            BindParams::Positional(values) => {
                for (idx, value) in values.iter().enumerate() {
                    stmt.raw_bind_parameter(idx + 1, value)?;
                }
            }
            BindParams::Named(values) => {
                for (name, value) in values {
                    if let Some(idx) = stmt.parameter_index(name)? {
                        stmt.raw_bind_parameter(idx, value)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Map one JSON value to a SQLite value.
fn to_sql_value(value: &Value) -> Result<SqlValue> {
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(SqlValue::Integer(i)),
            None => n.as_f64().map(SqlValue::Real).ok_or_else(|| {
                RelayError::InvalidArguments(format!("unsupported number: {}", n))
            }),
        },
        Value::String(s) => Ok(SqlValue::Text(s.clone())),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|b| u8::try_from(b).ok())
                    .ok_or_else(|| {
                        RelayError::InvalidArguments(
                            "blob values must be arrays of bytes (0-255)".to_string(),
                        )
                    })
            })
            .collect::<Result<Vec<u8>>>()
            .map(SqlValue::Blob),
        Value::Object(_) => Err(RelayError::InvalidArguments(
            "unsupported bind value: object".to_string(),
        )),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// Result Sets
// ============================================================================

/// Rows produced by one statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Value>>,
}

/// Map one SQLite cell to JSON. Non-finite reals become `null`.
pub fn cell_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
    }
}
