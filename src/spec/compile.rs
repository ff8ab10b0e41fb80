//! Spec file compilation.
//!
//! Expected shape (comma-separated, header row ignored):
//! name,width,type
//!
//! Example:
//! name,10,TEXT
//! valid,1,BOOLEAN
//! count,3,INTEGER
//!
//! Compiling creates the table, then for each row registers its width and adds
//! the column. Nothing is rolled back on failure: columns added before a bad
//! row stay in the store, but the table is left unregistered.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, instrument};

use crate::spec::{ColumnSpec, SpecRegistry, TableSpec};
use crate::store::{Backend, BackendError};

#[derive(Error, Debug)]
pub enum SpecError {
    #[error("read spec file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed spec at line {line}: {reason}")]
    MalformedSpec { line: usize, reason: String },
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Compile the spec file at `path` into `table`.
#[instrument(
    name = "spec::compile",
    level = "debug",
    skip(path, registry, backend),
    fields(path = %path.display())
)]
pub fn compile<B: Backend + ?Sized>(
    path: &Path,
    table: &str,
    registry: &mut SpecRegistry,
    backend: &mut B,
) -> Result<TableSpec, SpecError> {
    let text = fs::read_to_string(path).map_err(|source| SpecError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    compile_source(&text, table, registry, backend)
}

/// Compile spec text that has already been read.
pub fn compile_source<B: Backend + ?Sized>(
    text: &str,
    table: &str,
    registry: &mut SpecRegistry,
    backend: &mut B,
) -> Result<TableSpec, SpecError> {
    let mut lines = text.lines().enumerate();

    // 1) Header row carries no information.
    lines.next();

    // Blank lines are only tolerated at the end of the file.
    let rows: Vec<(usize, &str)> = lines.collect();
    let end = rows
        .iter()
        .rposition(|(_, line)| !line.trim().is_empty())
        .map_or(0, |i| i + 1);

    // 2) Table first; a rejected CREATE leaves any earlier registration alone.
    backend.create_empty_table(table)?;
    registry.begin(table);

    // 3) One column per row, in file order.
    let mut spec = TableSpec::new(table);
    for &(lineno, line) in &rows[..end] {
        let lno = lineno + 1;
        let column = match parse_record(line, lno) {
            Ok(c) => c,
            Err(e) => {
                registry.discard(table);
                return Err(e);
            }
        };

        registry.push_width(table, column.width);
        if let Err(e) = backend.add_column(table, &column.name, &column.col_type) {
            registry.discard(table);
            return Err(e.into());
        }
        debug!(table, column = %column.name, width = column.width, "column added");
        spec.columns.push(column);
    }

    Ok(spec)
}

/// Parse "name,10,TEXT" into a ColumnSpec.
fn parse_record(line: &str, lno: usize) -> Result<ColumnSpec, SpecError> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let [name, width, col_type] = fields.as_slice() else {
        return Err(malformed(
            lno,
            format!("expected 3 fields, found {}", fields.len()),
        ));
    };

    if name.is_empty() {
        return Err(malformed(lno, "empty column name"));
    }
    let width: usize = width
        .parse()
        .map_err(|_| malformed(lno, format!("width {:?} is not a number", width)))?;
    if width == 0 {
        return Err(malformed(lno, "width must be positive"));
    }
    if col_type.is_empty() {
        return Err(malformed(lno, "empty column type"));
    }

    Ok(ColumnSpec {
        name: name.to_string(),
        width,
        col_type: col_type.to_string(),
    })
}

fn malformed(line: usize, reason: impl Into<String>) -> SpecError {
    SpecError::MalformedSpec {
        line,
        reason: reason.into(),
    }
}
