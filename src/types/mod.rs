mod outcome;
mod sql_value;
mod table;

pub use outcome::ExecOutcome;
pub use sql_value::SqlValue;
pub use table::{DataRow, DataTable, RawQueryResult};
