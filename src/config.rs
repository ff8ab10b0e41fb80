//! Process configuration.
//!
//! Layering, later wins: built-in defaults -> JSON file (`--config`) ->
//! environment -> command-line flags (applied by `main`).
//!
//! JSON shape (every key optional):
//! {
//!   "db_path": "clover.sqlite3",
//!   "specs_dir": "specs",
//!   "data_dir": "data",
//!   "spec_ext": "csv",
//!   "data_ext": "txt",
//!   "spec_settle_ms": 3000,
//!   "data_settle_ms": 5000
//! }

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use serde::Deserialize;

use crate::Result;
use crate::watch::SettleDelays;

pub const ENV_DB_PATH: &str = "CLOVER_DB_PATH";
pub const ENV_SPECS_DIR: &str = "CLOVER_SPECS_DIR";
pub const ENV_DATA_DIR: &str = "CLOVER_DATA_DIR";
pub const ENV_SPEC_SETTLE_MS: &str = "CLOVER_SPEC_SETTLE_MS";
pub const ENV_DATA_SETTLE_MS: &str = "CLOVER_DATA_SETTLE_MS";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub db_path: PathBuf,
    pub specs_dir: PathBuf,
    pub data_dir: PathBuf,
    pub spec_ext: String,
    pub data_ext: String,
    pub spec_settle_ms: u64,
    pub data_settle_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("clover.sqlite3"),
            specs_dir: PathBuf::from("specs"),
            data_dir: PathBuf::from("data"),
            spec_ext: "csv".to_string(),
            data_ext: "txt".to_string(),
            spec_settle_ms: 3000,
            data_settle_ms: 5000,
        }
    }
}

impl Config {
    /// Defaults, overlaid by `file` if given, overlaid by the process environment.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut config = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parse config file {}", path.display()))
    }

    /// Overlay values found through `lookup` (normally `std::env::var`).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = lookup(ENV_DB_PATH) {
            self.db_path = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_SPECS_DIR) {
            self.specs_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_SPEC_SETTLE_MS) {
            self.spec_settle_ms = parse_ms(ENV_SPEC_SETTLE_MS, &v)?;
        }
        if let Some(v) = lookup(ENV_DATA_SETTLE_MS) {
            self.data_settle_ms = parse_ms(ENV_DATA_SETTLE_MS, &v)?;
        }
        Ok(())
    }

    pub fn settle(&self) -> SettleDelays {
        SettleDelays {
            spec: Duration::from_millis(self.spec_settle_ms),
            data: Duration::from_millis(self.data_settle_ms),
        }
    }
}

fn parse_ms(key: &str, value: &str) -> Result<u64> {
    match value.trim().parse() {
        Ok(ms) => Ok(ms),
        Err(_) => bail!("{} must be a number of milliseconds, got {:?}", key, value),
    }
}
