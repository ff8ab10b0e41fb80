/// One row of a spec file: `name,width,type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    /// Field width in characters. Always > 0.
    pub width: usize,
    /// Opaque type token handed to the backend's DDL.
    pub col_type: String,
}

/// Ordered column layout of one logical table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub table: String,
    pub columns: Vec<ColumnSpec>,
}

impl TableSpec {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: Vec::new(),
        }
    }

    pub fn widths(&self) -> Vec<usize> {
        self.columns.iter().map(|c| c.width).collect()
    }
}
