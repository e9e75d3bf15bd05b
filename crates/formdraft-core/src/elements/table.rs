//! Table grid: a rectangular matrix of cell strings.

use crate::error::{CanvasError, CanvasResult};
use serde::{Deserialize, Serialize};

/// Content of a newly created cell.
pub const DEFAULT_CELL: &str = "Cell";

/// Address of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

impl CellRef {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Row-major cell matrix.
///
/// Always has at least one row and one column, and every row has exactly
/// `cols()` cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableGrid {
    cells: Vec<Vec<String>>,
}

impl Default for TableGrid {
    fn default() -> Self {
        Self::filled(2, 2)
    }
}

impl TableGrid {
    /// Create a `rows` x `cols` grid of default cells.
    pub fn new(rows: usize, cols: usize) -> CanvasResult<Self> {
        if rows == 0 || cols == 0 {
            return Err(CanvasError::invalid(format!(
                "table must have at least one row and column, got {rows}x{cols}"
            )));
        }
        Ok(Self::filled(rows, cols))
    }

    fn filled(rows: usize, cols: usize) -> Self {
        Self {
            cells: vec![vec![DEFAULT_CELL.to_string(); cols]; rows],
        }
    }

    /// Build a grid from possibly ragged rows, padding short rows with
    /// empty cells. Returns None when there is nothing to build from.
    pub fn from_rows(mut rows: Vec<Vec<String>>) -> Option<Self> {
        let cols = rows.iter().map(Vec::len).max()?;
        if cols == 0 {
            return None;
        }
        for row in &mut rows {
            row.resize(cols, String::new());
        }
        Some(Self { cells: rows })
    }

    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    pub fn cols(&self) -> usize {
        self.cells.first().map(Vec::len).unwrap_or(0)
    }

    /// Rows of cells, top to bottom.
    pub fn cells(&self) -> &[Vec<String>] {
        &self.cells
    }

    pub fn cell(&self, at: CellRef) -> Option<&str> {
        self.cells.get(at.row)?.get(at.col).map(String::as_str)
    }

    /// Check the rectangular-matrix invariant.
    pub fn is_well_formed(&self) -> bool {
        let cols = self.cols();
        cols > 0 && self.cells.iter().all(|row| row.len() == cols)
    }

    /// Append a row of default cells.
    pub fn add_row(&mut self) {
        let row = self.default_row();
        self.cells.push(row);
    }

    /// Append a default cell to every row.
    pub fn add_column(&mut self) {
        for row in &mut self.cells {
            row.push(DEFAULT_CELL.to_string());
        }
    }

    /// Insert a row of default cells before row `at` (`at == rows()` appends).
    pub fn insert_row(&mut self, at: usize) -> CanvasResult<()> {
        if at > self.rows() {
            return Err(CanvasError::invalid(format!(
                "row {at} is outside a table with {} rows",
                self.rows()
            )));
        }
        let row = self.default_row();
        self.cells.insert(at, row);
        Ok(())
    }

    /// Insert a column of default cells before column `at`.
    pub fn insert_column(&mut self, at: usize) -> CanvasResult<()> {
        if at > self.cols() {
            return Err(CanvasError::invalid(format!(
                "column {at} is outside a table with {} columns",
                self.cols()
            )));
        }
        for row in &mut self.cells {
            row.insert(at, DEFAULT_CELL.to_string());
        }
        Ok(())
    }

    pub fn edit_cell(&mut self, at: CellRef, content: impl Into<String>) -> CanvasResult<()> {
        let (rows, cols) = (self.rows(), self.cols());
        let cell = self
            .cells
            .get_mut(at.row)
            .and_then(|row| row.get_mut(at.col))
            .ok_or_else(|| {
                CanvasError::invalid(format!(
                    "cell ({}, {}) is outside a {rows}x{cols} table",
                    at.row, at.col
                ))
            })?;
        *cell = content.into();
        Ok(())
    }

    /// Remove row `row`. Refuses to remove the last row.
    pub fn delete_row(&mut self, row: usize) -> CanvasResult<()> {
        if row >= self.rows() {
            return Err(CanvasError::invalid(format!(
                "row {row} is outside a table with {} rows",
                self.rows()
            )));
        }
        if self.rows() == 1 {
            return Err(CanvasError::invalid("cannot delete the last row of a table"));
        }
        self.cells.remove(row);
        Ok(())
    }

    /// Remove column `col`. Refuses to remove the last column.
    pub fn delete_column(&mut self, col: usize) -> CanvasResult<()> {
        if col >= self.cols() {
            return Err(CanvasError::invalid(format!(
                "column {col} is outside a table with {} columns",
                self.cols()
            )));
        }
        if self.cols() == 1 {
            return Err(CanvasError::invalid("cannot delete the last column of a table"));
        }
        for row in &mut self.cells {
            row.remove(col);
        }
        Ok(())
    }

    fn default_row(&self) -> Vec<String> {
        vec![DEFAULT_CELL.to_string(); self.cols()]
    }
}
