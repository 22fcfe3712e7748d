use std::collections::HashMap;
use std::sync::Mutex;
use shared::table::{Table, HEADER_ROW};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Table '{0}' not found")]
    TableNotFound(String),
    #[error("Row store unreachable: {0}")]
    Connectivity(String),
    #[error("Row store refused access: {0}")]
    Unauthorized(String),
    #[error("Row {0} cannot be written")]
    InvalidRow(usize),
    #[error("Column {0} is outside the table")]
    InvalidColumn(usize),
    #[error("Malformed store response: {0}")]
    Malformed(String),
    #[error("Failed to acquire store lock")]
    LockFailed,
}

/// Positional access to named tables whose first row is the header.
///
/// Rows and columns are 1-based. Implementations neither retry nor cache table contents;
/// every call goes to the backing store.
pub trait RowStore: Send + Sync {
    fn read_all(&self, table: &str) -> Result<Table, StoreError>;

    fn header(&self, table: &str) -> Result<Vec<String>, StoreError>;

    /// Values of one column, header value first.
    fn column_values(&self, table: &str, column: usize) -> Result<Vec<String>, StoreError>;

    fn append_row(&self, table: &str, fields: &[String]) -> Result<(), StoreError>;

    /// Writes a single cell. The header row is never writable.
    fn write_cell(&self, table: &str, row: usize, column: usize, value: &str) -> Result<(), StoreError>;
}

type Grid = Vec<Vec<String>>;

/// Row store kept in process memory. Row 0 of each grid is the header.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Grid>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(self, name: &str, header: &[&str]) -> Self {
        self.with_rows(name, header, &[])
    }

    pub fn with_rows(self, name: &str, header: &[&str], rows: &[&[&str]]) -> Self {
        let grid: Grid = std::iter::once(header)
            .chain(rows.iter().copied())
            .map(|row| row.iter().map(|v| v.to_string()).collect())
            .collect();
        if let Ok(mut tables) = self.tables.lock() {
            tables.insert(name.to_string(), grid);
        }
        self
    }

    /// Deletes a data row the way an external editor would, shifting later rows up.
    pub fn remove_row(&self, table: &str, row: usize) -> Result<(), StoreError> {
        self.with_grid(table, |grid| {
            if row <= HEADER_ROW || row > grid.len() {
                return Err(StoreError::InvalidRow(row));
            }
            grid.remove(row - 1);
            Ok(())
        })
    }

    fn with_grid<T>(&self, table: &str, f: impl FnOnce(&mut Grid) -> Result<T, StoreError>) -> Result<T, StoreError> {
        let mut tables = self.tables.lock().map_err(|_| StoreError::LockFailed)?;
        let grid = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        f(grid)
    }
}

impl RowStore for MemoryStore {
    fn read_all(&self, table: &str) -> Result<Table, StoreError> {
        self.with_grid(table, |grid| {
            let mut rows = grid.iter().cloned();
            let header = rows.next().unwrap_or_default();
            Ok(Table::new(header, rows.collect()))
        })
    }

    fn header(&self, table: &str) -> Result<Vec<String>, StoreError> {
        self.with_grid(table, |grid| Ok(grid.first().cloned().unwrap_or_default()))
    }

    fn column_values(&self, table: &str, column: usize) -> Result<Vec<String>, StoreError> {
        if column == 0 {
            return Err(StoreError::InvalidColumn(column));
        }
        self.with_grid(table, |grid| {
            Ok(grid
                .iter()
                .map(|row| row.get(column - 1).cloned().unwrap_or_default())
                .collect())
        })
    }

    fn append_row(&self, table: &str, fields: &[String]) -> Result<(), StoreError> {
        self.with_grid(table, |grid| {
            grid.push(fields.to_vec());
            Ok(())
        })
    }

    fn write_cell(&self, table: &str, row: usize, column: usize, value: &str) -> Result<(), StoreError> {
        self.with_grid(table, |grid| {
            let width = grid.first().map_or(0, Vec::len);
            if column == 0 || column > width {
                return Err(StoreError::InvalidColumn(column));
            }
            if row <= HEADER_ROW || row > grid.len() {
                return Err(StoreError::InvalidRow(row));
            }
            let cells = &mut grid[row - 1];
            if cells.len() < column {
                cells.resize(column, String::new());
            }
            cells[column - 1] = value.to_string();
            Ok(())
        })
    }
}
