//! mssql-rdao - relational data access over a SQL Server session
//!
//! A [`StatementExecutor`] owns one connection and runs statements through
//! it, shaping the rows into a table, a flat list, a key/value list or a
//! scalar. Write statements report rows affected and the last identity.
//!
//! # Example
//! ```ignore
//! use mssql_rdao::{ExecutorConfig, Query, StatementExecutor};
//!
//! let mut executor = StatementExecutor::open(
//!     "server=tcp:localhost,1433;user=sa;password=secret;database=shop",
//!     ExecutorConfig::default(),
//! )
//! .await?;
//!
//! let customers = executor.fetch_table("SELECT Id, Name FROM Customers").await?;
//! let count = executor
//!     .fetch_scalar(Query::new("SELECT COUNT(*) FROM Orders WHERE CustomerId = ?").arg(7))
//!     .await?;
//! let columns = executor.describe_table("Customers").await?;
//!
//! executor.close().await?;
//! ```

pub mod config;
pub mod drivers;
pub mod error;
pub mod identifier;
pub mod query;
pub mod traits;
pub mod types;

mod accumulate;
mod batch;
mod executor;

// Re-export main types for convenient access
pub use batch::Batch;
pub use config::{DeliveryMode, ExecutorConfig};
pub use error::{RdaoError, Result};
pub use executor::StatementExecutor;
pub use query::{merge_params, sql_param, Query};
pub use traits::{DatabaseDriver, RowSink};
pub use types::{DataRow, DataTable, ExecOutcome, RawQueryResult, SqlValue};
