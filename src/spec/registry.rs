//! Table name -> declared field widths.
//!
//! Only widths survive compilation; names and types are consumed by DDL.
//! The registry is owned by whoever drives the pipeline and mutated through
//! `&mut`, so there is exactly one writer at a time.

use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct SpecRegistry {
    widths: BTreeMap<String, Vec<usize>>,
}

impl SpecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh (empty) width list for `table`, replacing any previous one.
    pub fn begin(&mut self, table: &str) {
        self.widths.insert(table.to_string(), Vec::new());
    }

    /// Append a width to the list started by [`SpecRegistry::begin`].
    pub fn push_width(&mut self, table: &str, width: usize) {
        self.widths.entry(table.to_string()).or_default().push(width);
    }

    /// Drop the entry for `table` (used when a compile fails midway).
    pub fn discard(&mut self, table: &str) {
        self.widths.remove(table);
    }

    /// Widths for `table`, or None if the table has no usable spec.
    pub fn widths(&self, table: &str) -> Option<&[usize]> {
        self.widths
            .get(table)
            .map(Vec::as_slice)
            .filter(|w| !w.is_empty())
    }

    pub fn contains(&self, table: &str) -> bool {
        self.widths(table).is_some()
    }

    pub fn len(&self) -> usize {
        self.widths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widths.is_empty()
    }
}
