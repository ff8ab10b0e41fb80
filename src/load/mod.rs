//! Loading decoded rows into the backend.
//!
//! A data file is processed line by line. Row-level problems (lines that are
//! not UTF-8, incomplete records, rejected inserts) skip that row and are
//! logged; only a missing spec or an unreadable file aborts the whole file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str;

use thiserror::Error;
use tracing::{instrument, warn};

use crate::decode::{self, DecodeError};
use crate::spec::SpecRegistry;
use crate::store::{Backend, BackendError};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("no spec registered for table {0}")]
    NoSpecRegistered(String),
    #[error("read data file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Per-file outcome counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub inserted: usize,
    pub blank: usize,
    pub undecodable: usize,
    pub incomplete: usize,
    pub failed: usize,
}

/// Insert one decoded row. Values are passed through as strings, untyped.
pub fn load<B: Backend + ?Sized>(
    backend: &mut B,
    table: &str,
    values: &[String],
) -> Result<(), LoadError> {
    backend.insert_row(table, values)?;
    Ok(())
}

/// Decode and insert every line of the data file at `path` into `table`.
#[instrument(
    name = "load::file",
    level = "debug",
    skip(path, registry, backend),
    fields(path = %path.display())
)]
pub fn load_file<B: Backend + ?Sized>(
    path: &Path,
    table: &str,
    registry: &SpecRegistry,
    backend: &mut B,
) -> Result<LoadReport, LoadError> {
    if !registry.contains(table) {
        return Err(LoadError::NoSpecRegistered(table.to_string()));
    }

    // Raw bytes: encoding is checked per line so one bad row cannot sink the file.
    let bytes = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_bytes(&bytes, table, registry, backend)
}

/// Same as [`load_file`] over text already in memory.
pub fn load_lines<B: Backend + ?Sized>(
    text: &str,
    table: &str,
    registry: &SpecRegistry,
    backend: &mut B,
) -> Result<LoadReport, LoadError> {
    load_bytes(text.as_bytes(), table, registry, backend)
}

/// Same as [`load_file`] over raw file contents.
pub fn load_bytes<B: Backend + ?Sized>(
    bytes: &[u8],
    table: &str,
    registry: &SpecRegistry,
    backend: &mut B,
) -> Result<LoadReport, LoadError> {
    let mut report = LoadReport::default();
    if bytes.is_empty() {
        return Ok(report);
    }

    // A final newline terminates the last line rather than opening a new one.
    let body = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    for (lineno, raw) in body.split(|b| *b == b'\n').enumerate() {
        let lno = lineno + 1;
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);

        let line = match str::from_utf8(raw) {
            Ok(l) => l,
            Err(e) => {
                warn!(table, line = lno, err = %e, "skipping row that is not UTF-8");
                report.undecodable += 1;
                continue;
            }
        };

        let values = match decode::decode(registry, table, line) {
            Ok(v) if v.is_empty() => {
                report.blank += 1;
                continue;
            }
            Ok(v) => v,
            Err(DecodeError::NoSpecRegistered(t)) => {
                return Err(LoadError::NoSpecRegistered(t));
            }
            Err(e @ DecodeError::IncompleteRecord { .. }) => {
                warn!(table, line = lno, err = %e, "skipping row");
                report.incomplete += 1;
                continue;
            }
        };

        match load(backend, table, &values) {
            Ok(()) => report.inserted += 1,
            Err(e) => {
                warn!(table, line = lno, err = %e, "insert failed");
                report.failed += 1;
            }
        }
    }

    Ok(report)
}
