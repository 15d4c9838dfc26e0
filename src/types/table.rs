use crate::error::{RdaoError, Result};
use crate::types::SqlValue;

static NULL: SqlValue = SqlValue::Null;

/// A batch of rows handed over by a driver in one piece.
#[derive(Debug, Clone, Default)]
pub struct RawQueryResult {
    /// Column names in order
    pub columns: Vec<String>,
    /// Rows, where each row holds its values in column order
    pub rows: Vec<Vec<SqlValue>>,
}

impl RawQueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<SqlValue>>) -> Self {
        Self { columns, rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

/// A single row of a [`DataTable`]. Values are stored in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRow {
    items: Vec<SqlValue>,
}

impl DataRow {
    pub(crate) fn new(items: Vec<SqlValue>) -> Self {
        Self { items }
    }

    /// Gets a value by column position.
    pub fn get(&self, index: usize) -> Option<&SqlValue> {
        self.items.get(index)
    }

    pub fn items(&self) -> &[SqlValue] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Tabular query result: ordered column names plus ordered rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTable {
    columns: Vec<String>,
    rows: Vec<DataRow>,
}

impl DataTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a column at the end of the column list.
    pub fn add_column(&mut self, name: impl Into<String>) {
        self.columns.push(name.into());
    }

    /// Creates an empty row sized to the current column list.
    pub fn new_row(&self) -> DataRow {
        DataRow::new(vec![SqlValue::Null; self.columns.len()])
    }

    /// Appends a row. Missing trailing cells are padded with `Null`.
    pub fn add_row(&mut self, mut row: DataRow) {
        if row.items.len() < self.columns.len() {
            row.items.resize(self.columns.len(), SqlValue::Null);
        }
        self.rows.push(row);
    }

    /// Position of a column by exact name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Gets the value at `row` in the named column.
    pub fn value(&self, row: usize, column: &str) -> Result<&SqlValue> {
        let index = self
            .column_index(column)
            .ok_or_else(|| RdaoError::ColumnNotFound(column.to_string()))?;
        let row = self.rows.get(row).ok_or(RdaoError::UnexpectedRowCount {
            expected: row + 1,
            actual: self.rows.len(),
        })?;
        Ok(row.get(index).unwrap_or(&NULL))
    }

    /// Extracts the only row of the table.
    /// Returns an error if the table contains zero or more than one row.
    pub fn single_row(self) -> Result<DataRow> {
        let actual = self.rows.len();
        match <[DataRow; 1]>::try_from(self.rows) {
            Ok([row]) => Ok(row),
            Err(_) => Err(RdaoError::UnexpectedRowCount {
                expected: 1,
                actual,
            }),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[DataRow] {
        &self.rows
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
