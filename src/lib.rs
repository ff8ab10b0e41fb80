//! Spec-driven fixed-width ingestion.
//!
//! Spec files (`specs/<table>.csv`) declare a column layout; data files
//! (`data/<table>_<suffix>.txt`) are decoded against it and loaded into a
//! relational store whose tables are created from the specs.

pub mod config;
pub mod decode;
pub mod load;
pub mod logging;
pub mod spec;
pub mod store;
pub mod watch;

pub type Result<T> = anyhow::Result<T>;
