//! In-memory SQLite handle and the slot that owns it.
//!
//! CHANGELOG:
//! - 10/16/2026 - Initial implementation

use rusqlite::{Batch, Connection, OpenFlags};

use super::values::{cell_to_json, BindParams, ResultSet};
use crate::error::{RelayError, Result};

/// An open in-memory database.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open a new, empty in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        // Only the worker thread touches the connection
        let conn = Connection::open_in_memory_with_flags(
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    /// Run a non-query statement.
    ///
    /// Without bind values the whole text runs as a batch. With bind values
    /// only the first statement is prepared, bound and stepped once; text with
    /// no statement in it (blank or comments only) is rejected.
    pub fn run(&self, sql: &str, params: &BindParams) -> Result<()> {
        if params.is_empty() {
            self.conn.execute_batch(sql)?;
            return Ok(());
        }

        let mut batch = Batch::new(&self.conn, sql);
        let Some(mut stmt) = batch.next()? else {
            return Err(RelayError::InvalidArguments(
                "nothing to prepare: sql contains no statement".to_string(),
            ));
        };
        params.bind(&mut stmt)?;
        let mut rows = stmt.raw_query();
        rows.next()?;
        Ok(())
    }

    /// Run every statement in `sql`, collecting one result set per
    /// statement that returned rows.
    ///
    /// Bind values go to every statement, so extra positional values fail
    /// the same way they do in `run`.
    pub fn exec(&self, sql: &str, params: &BindParams) -> Result<Vec<ResultSet>> {
        let mut results = Vec::new();
        let mut batch = Batch::new(&self.conn, sql);

        while let Some(mut stmt) = batch.next()? {
            if !params.is_empty() {
                params.bind(&mut stmt)?;
            }

            let columns: Vec<String> = stmt
                .column_names()
                .into_iter()
                .map(String::from)
                .collect();
            let column_count = columns.len();

            let mut values = Vec::new();
            let mut rows = stmt.raw_query();
            while let Some(row) = rows.next()? {
                let mut cells = Vec::with_capacity(column_count);
                for idx in 0..column_count {
                    cells.push(cell_to_json(row.get_ref(idx)?));
                }
                values.push(cells);
            }

            if !values.is_empty() {
                results.push(ResultSet { columns, values });
            }
        }

        Ok(results)
    }

    /// Close the connection, surfacing any engine error.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| RelayError::Engine(e))
    }
}

/// Owner of the optional database handle.
///
/// Empty until `open` succeeds. Nothing else creates or drops the handle.
#[derive(Default)]
pub struct DatabaseSlot {
    db: Option<Database>,
}

impl DatabaseSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a fresh database, replacing (and closing) any existing one.
    /// Returns true when a previous handle was replaced.
    ///
    /// A failed open leaves the current handle untouched.
    pub fn open(&mut self) -> Result<bool> {
        let fresh = Database::open_in_memory()?;
        match self.db.replace(fresh) {
            Some(previous) => {
                if let Err(e) = previous.close() {
                    tracing::warn!(error = %e, "failed to close replaced database");
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// The live handle, or `NotInitialized`.
    pub fn get(&self) -> Result<&Database> {
        self.db.as_ref().ok_or(RelayError::NotInitialized)
    }

    pub fn is_open(&self) -> bool {
        self.db.is_some()
    }

    /// Dispose of the handle. Returns false if there was none.
    pub fn close(&mut self) -> Result<bool> {
        match self.db.take() {
            Some(db) => {
                db.close()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bind(values: serde_json::Value) -> BindParams {
        BindParams::from_json(Some(&values)).unwrap()
    }

    #[test]
    fn test_empty_slot_is_not_initialized() {
        let slot = DatabaseSlot::new();
        assert!(!slot.is_open());
        assert!(matches!(slot.get(), Err(RelayError::NotInitialized)));
    }

    #[test]
    fn test_open_replaces_previous_database() {
        let mut slot = DatabaseSlot::new();
        assert!(!slot.open().unwrap());
        slot.get()
            .unwrap()
            .run("CREATE TABLE t(x)", &BindParams::default())
            .unwrap();

        assert!(slot.open().unwrap());
        let err = slot
            .get()
            .unwrap()
            .exec("SELECT * FROM t", &BindParams::default())
            .unwrap_err();
        assert!(err.to_string().contains("no such table"));
    }

    #[test]
    fn test_close() {
        let mut slot = DatabaseSlot::new();
        assert!(!slot.close().unwrap());
        slot.open().unwrap();
        assert!(slot.close().unwrap());
        assert!(!slot.is_open());
    }

    #[test]
    fn test_run_batch_and_bound_insert() {
        let db = Database::open_in_memory().unwrap();
        db.run(
            "CREATE TABLE t(x); CREATE TABLE u(y);",
            &BindParams::default(),
        )
        .unwrap();
        db.run("INSERT INTO t VALUES (?)", &bind(json!([5])))
            .unwrap();

        let results = db.exec("SELECT * FROM t", &BindParams::default()).unwrap();
        assert_eq!(
            results,
            vec![ResultSet {
                columns: vec!["x".to_string()],
                values: vec![vec![json!(5)]],
            }]
        );
    }

    #[test]
    fn test_run_tolerates_rows() {
        let db = Database::open_in_memory().unwrap();
        db.run("SELECT ?", &bind(json!([1]))).unwrap();
    }

    #[test]
    fn test_too_many_positional_values_fail() {
        let db = Database::open_in_memory().unwrap();
        db.run("CREATE TABLE t(x)", &BindParams::default()).unwrap();
        let err = db
            .run("INSERT INTO t VALUES (?)", &bind(json!([1, 2])))
            .unwrap_err();
        assert_eq!(err.kind(), "engine");
    }

    #[test]
    fn test_exec_extra_positional_values_fail() {
        let db = Database::open_in_memory().unwrap();
        let err = db.exec("SELECT 1", &bind(json!([5]))).unwrap_err();
        assert_eq!(err.kind(), "engine");
    }

    #[test]
    fn test_run_with_params_and_no_statement() {
        let db = Database::open_in_memory().unwrap();
        for sql in ["", "   ", "-- only comment"] {
            let err = db.run(sql, &bind(json!([1]))).unwrap_err();
            assert_eq!(err.kind(), "invalid_arguments");
            assert!(err.to_string().contains("nothing to prepare"), "{}", err);
        }
    }

    #[test]
    fn test_named_params() {
        let db = Database::open_in_memory().unwrap();
        db.run("CREATE TABLE t(a, b)", &BindParams::default()).unwrap();
        db.run(
            "INSERT INTO t VALUES (:a, :b)",
            &bind(json!({":a": "x", ":b": null, ":unused": 1})),
        )
        .unwrap();

        let results = db
            .exec("SELECT a, b FROM t WHERE a = $a", &bind(json!({"$a": "x"})))
            .unwrap();
        assert_eq!(results[0].values, vec![vec![json!("x"), json!(null)]]);
    }

    #[test]
    fn test_exec_multiple_statements() {
        let db = Database::open_in_memory().unwrap();
        let results = db
            .exec(
                "CREATE TABLE t(x); SELECT 1 AS a; SELECT 2 AS b WHERE 0; SELECT 'z' AS c, x'0102' AS d;",
                &BindParams::default(),
            )
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].columns, vec!["a"]);
        assert_eq!(results[1].columns, vec!["c", "d"]);
        assert_eq!(results[1].values, vec![vec![json!("z"), json!([1, 2])]]);
    }

    #[test]
    fn test_exec_no_rows_is_empty() {
        let db = Database::open_in_memory().unwrap();
        db.run("CREATE TABLE t(x)", &BindParams::default()).unwrap();
        assert!(db.exec("SELECT * FROM t", &BindParams::default()).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_sql() {
        let db = Database::open_in_memory().unwrap();
        let err = db.exec("SELEC 1", &BindParams::default()).unwrap_err();
        assert!(err.to_string().contains("syntax error"));
    }
}
