//! SQLite backend.
//!
//! SQLite cannot create a table without columns, so every table starts with a
//! hidden `_row_id INTEGER PRIMARY KEY` column and inserts bind `NULL` to it.

use std::path::Path;

use rusqlite::{Connection, params_from_iter};
use tracing::{debug, instrument};

use super::{Backend, BackendError, ROW_ID_COLUMN, check_column_name};

pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    pub fn open(path: &Path) -> Result<Self, BackendError> {
        Ok(Self {
            conn: Connection::open(path)?,
        })
    }

    pub fn in_memory() -> Result<Self, BackendError> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Backend for SqliteBackend {
    #[instrument(name = "store::sqlite::create_table", level = "debug", skip(self))]
    fn create_empty_table(&mut self, table: &str) -> Result<(), BackendError> {
        let sql = format!(
            "CREATE TABLE \"{}\" (\"{}\" INTEGER PRIMARY KEY)",
            table, ROW_ID_COLUMN
        );
        debug!(%sql);
        self.conn.execute(&sql, [])?;
        Ok(())
    }

    #[instrument(name = "store::sqlite::add_column", level = "debug", skip(self))]
    fn add_column(&mut self, table: &str, name: &str, col_type: &str) -> Result<(), BackendError> {
        check_column_name(name)?;
        let sql = format!(
            "ALTER TABLE \"{}\" ADD COLUMN \"{}\" {}",
            table, name, col_type
        );
        debug!(%sql);
        self.conn.execute(&sql, [])?;
        Ok(())
    }

    #[instrument(
        name = "store::sqlite::insert",
        level = "trace",
        skip(self, values),
        fields(values = values.len())
    )]
    fn insert_row(&mut self, table: &str, values: &[String]) -> Result<(), BackendError> {
        let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("?{}", i)).collect();
        let mut sql = format!("INSERT INTO \"{}\" VALUES (NULL", table);
        for p in &placeholders {
            sql.push_str(", ");
            sql.push_str(p);
        }
        sql.push(')');
        self.conn.execute(&sql, params_from_iter(values.iter()))?;
        Ok(())
    }
}
