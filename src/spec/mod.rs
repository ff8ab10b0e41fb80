//! Spec layer: column layouts read from spec files + the width registry.
//!
//! This module is intentionally separate from data decoding and loading.
//! It owns:
//! - ColumnSpec / TableSpec (one parsed spec file)
//! - SpecRegistry (table name -> declared widths)
//! - the compiler that turns a spec file into DDL + a registry entry

pub mod column;
pub mod compile;
pub mod registry;

pub use column::{ColumnSpec, TableSpec};
pub use compile::{SpecError, compile};
pub use registry::SpecRegistry;
