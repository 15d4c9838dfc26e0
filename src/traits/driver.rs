use async_trait::async_trait;

use crate::error::Result;
use crate::types::{RawQueryResult, SqlValue};

/// Receives the rows of one statement as the driver produces them.
///
/// Drivers feed a sink in one of two ways: streamed (`columns` once, then
/// `row` per row) or bulk (`batch` with everything at once). Both must leave
/// the sink in the same state for the same result set.
pub trait RowSink: Send {
    /// Column metadata for a result set. Called once per result set.
    fn columns(&mut self, names: &[String]);

    /// One row, values in column order.
    fn row(&mut self, values: Vec<SqlValue>);

    /// A whole result set delivered at once.
    fn batch(&mut self, result: RawQueryResult) {
        if !result.columns.is_empty() {
            self.columns(&result.columns);
        }
        for values in result.rows {
            self.row(values);
        }
    }
}

/// Trait for database driver implementations.
/// Drivers are responsible for:
/// - Holding one open session to the engine
/// - Converting SqlValue parameters to native types
/// - Executing statements and feeding rows to a RowSink
#[async_trait]
pub trait DatabaseDriver: Send {
    /// Execute SQL text with the given parameters, feeding every produced row
    /// into `sink`. Parameters use SQL Server-style placeholders (@P1, @P2, etc.)
    async fn execute(
        &mut self,
        sql: &str,
        params: &[SqlValue],
        sink: &mut dyn RowSink,
    ) -> Result<()>;

    /// Terminate the session.
    async fn close(&mut self) -> Result<()>;
}
