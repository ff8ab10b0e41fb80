//! File-name classification for watched directories.
//!
//! spec file:  <specs_dir>/<table>.<spec_ext>
//! data file:  <data_dir>/<table>_<suffix>.<data_ext>
//!
//! The data table capture is greedy, so "daily_sales_2016-3-1.txt" belongs to
//! table "daily_sales".

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Spec,
    Data,
}

/// A watched file whose name matched one of the two patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub kind: FileKind,
    pub path: PathBuf,
    pub table: String,
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("{} does not match a spec or data file pattern", .0.display())]
pub struct UnmatchedEvent(pub PathBuf);

#[derive(Debug, Clone)]
pub struct Classifier {
    specs_dir: PathBuf,
    data_dir: PathBuf,
    spec_name: Regex,
    data_name: Regex,
}

impl Classifier {
    pub fn new(
        specs_dir: &Path,
        data_dir: &Path,
        spec_ext: &str,
        data_ext: &str,
    ) -> Result<Self, regex::Error> {
        let spec_name = Regex::new(&format!(r"^(?P<table>.+)\.{}$", regex::escape(spec_ext)))?;
        let data_name = Regex::new(&format!(
            r"^(?P<table>.+)_(?P<suffix>.+)\.{}$",
            regex::escape(data_ext)
        ))?;
        Ok(Self {
            specs_dir: resolve(specs_dir),
            data_dir: resolve(data_dir),
            spec_name,
            data_name,
        })
    }

    pub fn specs_dir(&self) -> &Path {
        &self.specs_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn classify(&self, path: &Path) -> Result<Classified, UnmatchedEvent> {
        let unmatched = || UnmatchedEvent(path.to_path_buf());

        let parent = path.parent().map(resolve).ok_or_else(unmatched)?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(unmatched)?;

        let candidates = [
            (FileKind::Spec, &self.specs_dir, &self.spec_name),
            (FileKind::Data, &self.data_dir, &self.data_name),
        ];
        for (kind, dir, pattern) in candidates {
            if parent != *dir {
                continue;
            }
            // A directory match alone is not enough; the table capture must exist.
            if let Some(table) = pattern.captures(file_name).and_then(|c| c.name("table")) {
                return Ok(Classified {
                    kind,
                    path: path.to_path_buf(),
                    table: table.as_str().to_string(),
                });
            }
        }

        Err(unmatched())
    }
}

/// Canonical form of a directory when it exists, the path as given otherwise.
fn resolve(dir: &Path) -> PathBuf {
    fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf())
}
