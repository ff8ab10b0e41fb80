//! In-memory backend that records every statement it accepts.
//!
//! Used for `--dry-run` and as the statement recorder in tests. An optional
//! hook sees each statement as it is accepted, so a long-running dry run can
//! echo statements without waiting for the end.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use super::{Backend, BackendError, check_column_name};

/// A statement accepted by [`MemoryBackend`], in the order it was issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    CreateTable {
        table: String,
    },
    AddColumn {
        table: String,
        name: String,
        col_type: String,
    },
    Insert {
        table: String,
        values: Vec<String>,
    },
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::CreateTable { table } => write!(f, "CREATE TABLE {}()", table),
            Statement::AddColumn {
                table,
                name,
                col_type,
            } => write!(f, "ALTER TABLE {} ADD COLUMN {} {}", table, name, col_type),
            Statement::Insert { table, values } => {
                let quoted: Vec<String> = values.iter().map(|v| format!("'{}'", v)).collect();
                write!(f, "INSERT INTO {} VALUES({})", table, quoted.join(","))
            }
        }
    }
}

#[derive(Debug, Default)]
struct MemTable {
    columns: Vec<(String, String)>,
    rows: Vec<Vec<String>>,
}

type RecordHook = Box<dyn FnMut(&Statement) + Send>;

#[derive(Default)]
pub struct MemoryBackend {
    tables: BTreeMap<String, MemTable>,
    statements: Vec<Statement>,
    on_record: Option<RecordHook>,
}

impl fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("tables", &self.tables)
            .field("statements", &self.statements)
            .field("on_record", &self.on_record.is_some())
            .finish()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `hook` with every statement right after it is accepted.
    pub fn on_record(mut self, hook: impl FnMut(&Statement) + Send + 'static) -> Self {
        self.on_record = Some(Box::new(hook));
        self
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn rows(&self, table: &str) -> Option<&[Vec<String>]> {
        self.tables.get(table).map(|t| t.rows.as_slice())
    }

    /// Column names of `table` in creation order.
    pub fn columns(&self, table: &str) -> Option<Vec<&str>> {
        self.tables
            .get(table)
            .map(|t| t.columns.iter().map(|(name, _)| name.as_str()).collect())
    }

    fn record(&mut self, stmt: Statement) {
        debug!(statement = %stmt, "memory backend");
        if let Some(hook) = self.on_record.as_mut() {
            hook(&stmt);
        }
        self.statements.push(stmt);
    }
}

impl Backend for MemoryBackend {
    fn create_empty_table(&mut self, table: &str) -> Result<(), BackendError> {
        if self.tables.contains_key(table) {
            return Err(BackendError::TableExists(table.to_string()));
        }
        self.tables.insert(table.to_string(), MemTable::default());
        self.record(Statement::CreateTable {
            table: table.to_string(),
        });
        Ok(())
    }

    fn add_column(&mut self, table: &str, name: &str, col_type: &str) -> Result<(), BackendError> {
        let t = self
            .tables
            .get_mut(table)
            .ok_or_else(|| BackendError::NoSuchTable(table.to_string()))?;
        check_column_name(name)?;
        if t.columns.iter().any(|(c, _)| c.eq_ignore_ascii_case(name)) {
            return Err(BackendError::DuplicateColumn {
                table: table.to_string(),
                column: name.to_string(),
            });
        }
        t.columns.push((name.to_string(), col_type.to_string()));
        self.record(Statement::AddColumn {
            table: table.to_string(),
            name: name.to_string(),
            col_type: col_type.to_string(),
        });
        Ok(())
    }

    fn insert_row(&mut self, table: &str, values: &[String]) -> Result<(), BackendError> {
        let t = self
            .tables
            .get_mut(table)
            .ok_or_else(|| BackendError::NoSuchTable(table.to_string()))?;
        if t.columns.len() != values.len() {
            return Err(BackendError::ColumnCount {
                table: table.to_string(),
                expected: t.columns.len(),
                got: values.len(),
            });
        }
        t.rows.push(values.to_vec());
        self.record(Statement::Insert {
            table: table.to_string(),
            values: values.to_vec(),
        });
        Ok(())
    }
}
