//! In-memory shape of a row-store table.
//!
//! Addressing is 1-based and positional: row 1 holds the header, the first data row is row 2,
//! and a column's index is its position in the header.

use thiserror::Error;

pub const HEADER_ROW: usize = 1;
pub const FIRST_DATA_ROW: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Column '{0}' is missing from the table header")]
pub struct ColumnMissing(pub String);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Builds a table, padding short rows with empty cells up to the header width.
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = header.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                if row.len() < width {
                    row.resize(width, String::new());
                }
                row
            })
            .collect();
        Self { header, rows }
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> impl Iterator<Item = &[String]> {
        self.rows.iter().map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Result<usize, ColumnMissing> {
        column_position(&self.header, name)
    }

    /// Sheet row number of the data row at `position` (0-based).
    pub fn sheet_row(position: usize) -> usize {
        position + FIRST_DATA_ROW
    }
}

/// 1-based position of `name` in `header`.
pub fn column_position(header: &[String], name: &str) -> Result<usize, ColumnMissing> {
    header
        .iter()
        .position(|label| label.trim() == name)
        .map(|idx| idx + 1)
        .ok_or_else(|| ColumnMissing(name.to_string()))
}

/// Cell at a 1-based column, empty when the row is too short.
pub fn cell(row: &[String], column: usize) -> &str {
    column
        .checked_sub(1)
        .and_then(|idx| row.get(idx))
        .map(String::as_str)
        .unwrap_or("")
}

/// Sheet row holding `key` in a column fetched with its header at position 0.
pub fn locate_row(column_values: &[String], key: &str) -> Option<usize> {
    column_values
        .iter()
        .skip(1)
        .position(|value| value.trim() == key)
        .map(Table::sheet_row)
}
