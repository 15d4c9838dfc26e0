//! Result-shaping strategies.
//!
//! Each accumulator is a [`RowSink`] the executor registers for exactly one
//! statement. On success it is turned into its output with `finish`; on a
//! driver error it is dropped with whatever it had collected.

use crate::traits::RowSink;
use crate::types::{DataRow, DataTable, ExecOutcome, SqlValue};

/// A row sink that produces one result shape.
pub(crate) trait Accumulator: RowSink {
    type Output;

    fn finish(self) -> Self::Output;
}

/// Builds a [`DataTable`]. The column list is fixed by the metadata of the
/// first result set that delivers a row, whether it came streamed or as part
/// of a batch. A result without rows keeps the last metadata it announced.
#[derive(Debug, Default)]
pub(crate) struct TableBuilder {
    table: DataTable,
    pending: Vec<String>,
    headers_read: bool,
}

impl TableBuilder {
    fn fix_headers(&mut self) {
        for name in std::mem::take(&mut self.pending) {
            self.table.add_column(name);
        }
        self.headers_read = true;
    }
}

impl RowSink for TableBuilder {
    fn columns(&mut self, names: &[String]) {
        if self.headers_read || names.is_empty() {
            return;
        }
        self.pending = names.to_vec();
    }

    fn row(&mut self, values: Vec<SqlValue>) {
        if !self.headers_read {
            self.fix_headers();
        }
        self.table.add_row(DataRow::new(values));
    }
}

impl Accumulator for TableBuilder {
    type Output = DataTable;

    fn finish(mut self) -> DataTable {
        if !self.headers_read {
            self.fix_headers();
        }
        self.table
    }
}

/// Collects column 0 of every row.
#[derive(Debug, Default)]
pub(crate) struct ListBuilder {
    list: Vec<SqlValue>,
}

impl RowSink for ListBuilder {
    fn columns(&mut self, _names: &[String]) {}

    fn row(&mut self, values: Vec<SqlValue>) {
        if let Some(first) = values.into_iter().next() {
            self.list.push(first);
        }
    }
}

impl Accumulator for ListBuilder {
    type Output = Vec<SqlValue>;

    fn finish(self) -> Vec<SqlValue> {
        self.list
    }
}

/// Collects `(col0, col1)` per row, or `(col0, col0)` for single-column rows.
#[derive(Debug, Default)]
pub(crate) struct KeyValueBuilder {
    pairs: Vec<(SqlValue, SqlValue)>,
}

impl RowSink for KeyValueBuilder {
    fn columns(&mut self, _names: &[String]) {}

    fn row(&mut self, values: Vec<SqlValue>) {
        let mut cells = values.into_iter();
        match (cells.next(), cells.next()) {
            (Some(key), Some(value)) => self.pairs.push((key, value)),
            (Some(key), None) => self.pairs.push((key.clone(), key)),
            _ => {}
        }
    }
}

impl Accumulator for KeyValueBuilder {
    type Output = Vec<(SqlValue, SqlValue)>;

    fn finish(self) -> Vec<(SqlValue, SqlValue)> {
        self.pairs
    }
}

/// Keeps column 0 of the first row; everything after it is consumed and ignored.
#[derive(Debug, Default)]
pub(crate) struct ScalarBuilder {
    value: Option<SqlValue>,
    value_read: bool,
}

impl RowSink for ScalarBuilder {
    fn columns(&mut self, _names: &[String]) {}

    fn row(&mut self, values: Vec<SqlValue>) {
        if !self.value_read {
            self.value = values.into_iter().next();
            self.value_read = true;
        }
    }
}

impl Accumulator for ScalarBuilder {
    type Output = Option<SqlValue>;

    fn finish(self) -> Option<SqlValue> {
        self.value
    }
}

/// Captures `(rows affected, identity)` from the first row of the last
/// result set, which is the trailing `SELECT @@ROWCOUNT, @@IDENTITY`.
#[derive(Debug, Default)]
pub(crate) struct OutcomeBuilder {
    outcome: Option<ExecOutcome>,
    awaiting_row: bool,
}

impl RowSink for OutcomeBuilder {
    fn columns(&mut self, _names: &[String]) {
        self.awaiting_row = true;
    }

    fn row(&mut self, values: Vec<SqlValue>) {
        if !self.awaiting_row && self.outcome.is_some() {
            return;
        }
        let mut cells = values.into_iter();
        let rows_affected = cells.next().and_then(|v| v.as_i64());
        let last_identity = cells.next().unwrap_or(SqlValue::Null);
        self.outcome = Some(ExecOutcome {
            rows_affected,
            last_identity,
        });
        self.awaiting_row = false;
    }
}

impl Accumulator for OutcomeBuilder {
    type Output = ExecOutcome;

    fn finish(self) -> ExecOutcome {
        self.outcome.unwrap_or_default()
    }
}
