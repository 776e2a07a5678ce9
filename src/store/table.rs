//! Typed-column row storage
//!
//! [`TableModel`] is the surface a tabular view renders from: rows keyed by
//! stable [`RowHandle`]s, cells addressed by column index, one fixed
//! [`ColumnType`] per column. [`ListStore`] is the in-memory implementation.

use crate::error::{Result, XrdError};
use crate::types::{ColumnType, Value};
use std::fmt;

/// Stable identity of a row, unaffected by inserts, removals or sorting
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowHandle(pub u64);

impl fmt::Debug for RowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RowHandle({})", self.0)
    }
}

/// Row-oriented data source with typed columns
#[cfg_attr(test, mockall::automock)]
pub trait TableModel {
    fn n_columns(&self) -> usize;
    fn column_type(&self, column: usize) -> Option<ColumnType>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn append(&mut self, cells: Vec<Value>) -> Result<RowHandle>;
    fn insert(&mut self, position: usize, cells: Vec<Value>) -> Result<RowHandle>;
    /// Returns false when the row does not exist
    fn remove(&mut self, row: RowHandle) -> bool;
    fn set_cell(&mut self, row: RowHandle, column: usize, value: Value) -> Result<()>;
    fn value(&self, row: RowHandle, column: usize) -> Option<Value>;
    fn position(&self, row: RowHandle) -> Option<usize>;
    fn row_at(&self, position: usize) -> Option<RowHandle>;
    /// Rearrange rows; `order` must be a permutation of the current handles
    fn reorder(&mut self, order: &[RowHandle]) -> Result<()>;
}

/// In-memory [`TableModel`]
#[derive(Debug, Clone)]
pub struct ListStore {
    column_types: Vec<ColumnType>,
    rows: Vec<(RowHandle, Vec<Value>)>,
    next_handle: u64,
}

impl ListStore {
    pub fn new(column_types: Vec<ColumnType>) -> Self {
        Self {
            column_types,
            rows: Vec::new(),
            next_handle: 0,
        }
    }

    pub fn column_types(&self) -> &[ColumnType] {
        &self.column_types
    }

    /// Rows in display order
    pub fn rows(&self) -> impl Iterator<Item = (RowHandle, &[Value])> {
        self.rows.iter().map(|(h, cells)| (*h, cells.as_slice()))
    }

    fn check_cell(&self, column: usize, value: &Value) -> Result<()> {
        let column_type = self.column_types.get(column).ok_or_else(|| {
            XrdError::Configuration(format!(
                "column {} out of range ({} columns)",
                column,
                self.column_types.len()
            ))
        })?;
        if column_type.accepts(value) {
            Ok(())
        } else {
            Err(XrdError::Conversion {
                column,
                value: value.to_text(),
                expected: column_type.to_string(),
            })
        }
    }

    fn check_row(&self, cells: &[Value]) -> Result<()> {
        if cells.len() != self.column_types.len() {
            return Err(XrdError::Configuration(format!(
                "row has {} cells, store has {} columns",
                cells.len(),
                self.column_types.len()
            )));
        }
        cells
            .iter()
            .enumerate()
            .try_for_each(|(column, value)| self.check_cell(column, value))
    }

    fn allocate(&mut self) -> RowHandle {
        let handle = RowHandle(self.next_handle);
        self.next_handle += 1;
        handle
    }

    fn index_of(&self, row: RowHandle) -> Option<usize> {
        self.rows.iter().position(|(h, _)| *h == row)
    }
}

impl TableModel for ListStore {
    fn n_columns(&self) -> usize {
        self.column_types.len()
    }

    fn column_type(&self, column: usize) -> Option<ColumnType> {
        self.column_types.get(column).copied()
    }

    fn len(&self) -> usize {
        self.rows.len()
    }

    fn append(&mut self, cells: Vec<Value>) -> Result<RowHandle> {
        let position = self.rows.len();
        self.insert(position, cells)
    }

    fn insert(&mut self, position: usize, cells: Vec<Value>) -> Result<RowHandle> {
        self.check_row(&cells)?;
        let handle = self.allocate();
        let position = position.min(self.rows.len());
        self.rows.insert(position, (handle, cells));
        Ok(handle)
    }

    fn remove(&mut self, row: RowHandle) -> bool {
        match self.index_of(row) {
            Some(index) => {
                self.rows.remove(index);
                true
            }
            None => false,
        }
    }

    fn set_cell(&mut self, row: RowHandle, column: usize, value: Value) -> Result<()> {
        self.check_cell(column, &value)?;
        let index = self
            .index_of(row)
            .ok_or_else(|| XrdError::Configuration(format!("{:?} is not in the store", row)))?;
        self.rows[index].1[column] = value;
        Ok(())
    }

    fn value(&self, row: RowHandle, column: usize) -> Option<Value> {
        let index = self.index_of(row)?;
        self.rows[index].1.get(column).cloned()
    }

    fn position(&self, row: RowHandle) -> Option<usize> {
        self.index_of(row)
    }

    fn row_at(&self, position: usize) -> Option<RowHandle> {
        self.rows.get(position).map(|(h, _)| *h)
    }

    fn reorder(&mut self, order: &[RowHandle]) -> Result<()> {
        if order.len() != self.rows.len() {
            return Err(XrdError::Configuration(format!(
                "reorder expects {} rows, got {}",
                self.rows.len(),
                order.len()
            )));
        }
        let mut remaining = std::mem::take(&mut self.rows);
        let mut reordered = Vec::with_capacity(remaining.len());
        for handle in order {
            match remaining.iter().position(|(h, _)| h == handle) {
                Some(index) => reordered.push(remaining.swap_remove(index)),
                None => {
                    // Put back what we took so no row is lost
                    reordered.append(&mut remaining);
                    self.rows = reordered;
                    return Err(XrdError::Configuration(format!(
                        "{:?} is missing from the store or listed twice",
                        handle
                    )));
                }
            }
        }
        self.rows = reordered;
        Ok(())
    }
}
