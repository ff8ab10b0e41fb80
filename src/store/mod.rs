//! Storage backends: the relational store the pipeline writes into.
//!
//! The pipeline only needs three operations, so anything that can create a
//! table, grow it by one column and append a row satisfies [`Backend`].
//!
//! Table and column names come straight from file names and spec rows and are
//! interpolated into statements without escaping. That is only safe because
//! the watched directories are controlled by the deployment; do not point the
//! watcher at directories writable by untrusted parties. Row values are never
//! interpolated.
//!
//! [`ROW_ID_COLUMN`] is reserved: the SQLite backend keys every table on it,
//! and both backends refuse a spec column of that name (compared ASCII
//! case-insensitively, as SQLite compares identifiers).

pub mod memory;
pub mod sqlite;

pub use memory::{MemoryBackend, Statement};
pub use sqlite::SqliteBackend;

use thiserror::Error;

/// Hidden key column every SQLite table is created with.
pub const ROW_ID_COLUMN: &str = "_row_id";

/// Reject column names a spec may not declare.
pub(crate) fn check_column_name(name: &str) -> Result<(), BackendError> {
    if name.eq_ignore_ascii_case(ROW_ID_COLUMN) {
        return Err(BackendError::ReservedColumn(name.to_string()));
    }
    Ok(())
}

pub trait Backend {
    /// Create `table` with no user-visible columns.
    fn create_empty_table(&mut self, table: &str) -> Result<(), BackendError>;

    /// Append a column to an existing table. `col_type` is passed through verbatim.
    fn add_column(&mut self, table: &str, name: &str, col_type: &str) -> Result<(), BackendError>;

    /// Insert one row; `values` are in declared column order.
    fn insert_row(&mut self, table: &str, values: &[String]) -> Result<(), BackendError>;
}

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("table {0} already exists")]
    TableExists(String),
    #[error("table {0} does not exist")]
    NoSuchTable(String),
    #[error("column {column} already exists in {table}")]
    DuplicateColumn { table: String, column: String },
    #[error("column name {0} is reserved")]
    ReservedColumn(String),
    #[error("column count mismatch for {table}: expected {expected}, got {got}")]
    ColumnCount {
        table: String,
        expected: usize,
        got: usize,
    },
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
}
