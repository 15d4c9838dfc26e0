use std::time::Instant;

use tracing::{debug, warn};

use crate::accumulate::{
    Accumulator, KeyValueBuilder, ListBuilder, OutcomeBuilder, ScalarBuilder, TableBuilder,
};
use crate::batch::Batch;
use crate::config::ExecutorConfig;
use crate::drivers::MssqlDriver;
use crate::error::{RdaoError, Result};
use crate::identifier::validate_identifier;
use crate::query::Query;
use crate::traits::DatabaseDriver;
use crate::types::{DataTable, ExecOutcome, SqlValue};

/// Appended to every statement run through `execute_single`.
const OUTCOME_QUERY: &str = "; SELECT @@ROWCOUNT, @@IDENTITY";

const DESCRIBE_TABLE_SQL: &str = "SELECT col.name FROM sys.tables AS tab \
    INNER JOIN sys.columns AS col ON tab.object_id = col.object_id \
    WHERE tab.name = @P1 ORDER BY col.column_id";

/// Runs statements over one SQL Server session and shapes their results.
///
/// One statement runs at a time: every executing method takes `&mut self`,
/// and `close` consumes the executor.
///
/// # Example
/// ```ignore
/// let mut executor = StatementExecutor::open(
///     "server=tcp:localhost,1433;user=sa;password=secret;database=shop",
///     ExecutorConfig::default(),
/// )
/// .await?;
///
/// let names = executor
///     .fetch_list(Query::new("SELECT Name FROM Customers WHERE Country = :c").bind("c", "NZ"))
///     .await?;
/// let outcome = executor
///     .execute_single("INSERT INTO Customers (Name) VALUES (N'Kiri')")
///     .await?;
///
/// executor.close().await?;
/// ```
pub struct StatementExecutor {
    driver: Box<dyn DatabaseDriver>,
    config: ExecutorConfig,
    last_outcome: Option<ExecOutcome>,
}

impl StatementExecutor {
    /// Connect to SQL Server using an ADO.NET-style connection string.
    /// A failed connect is reported immediately; there is no retry.
    pub async fn open(target: &str, config: ExecutorConfig) -> Result<Self> {
        if config.debug {
            debug!(op = "open", "opening SQL Server connection");
        }
        match MssqlDriver::connect(target, config.delivery).await {
            Ok(driver) => Ok(Self::with_driver(Box::new(driver), config)),
            Err(e) => {
                if config.debug {
                    warn!(op = "open", error = %e, "connection failed");
                }
                Err(e)
            }
        }
    }

    /// Create an executor over an already open driver.
    /// Useful for testing or using alternative database drivers.
    pub fn with_driver(driver: Box<dyn DatabaseDriver>, config: ExecutorConfig) -> Self {
        Self {
            driver,
            config,
            last_outcome: None,
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Outcome of the most recent successful `execute_single`.
    pub fn last_outcome(&self) -> Option<&ExecOutcome> {
        self.last_outcome.as_ref()
    }

    /// Terminate the session.
    pub async fn close(mut self) -> Result<()> {
        if self.config.debug {
            debug!(op = "close", "closing SQL Server connection");
        }
        let result = self.driver.close().await;
        if self.config.debug {
            match &result {
                Ok(()) => debug!(op = "close", "connection closed"),
                Err(e) => warn!(op = "close", error = %e, "disconnect failed"),
            }
        }
        result
    }

    /// The final SQL text a query resolves to.
    pub fn resolve(&self, query: impl Into<Query>) -> Result<String> {
        query.into().resolve()
    }

    /// Run a query and collect every row into a table.
    pub async fn fetch_table(&mut self, query: impl Into<Query>) -> Result<DataTable> {
        let sql = self.prepare("fetch_table", query.into())?;
        self.run("fetch_table", &sql, &[], TableBuilder::default()).await
    }

    /// Run a query and collect the first column of every row.
    pub async fn fetch_list(&mut self, query: impl Into<Query>) -> Result<Vec<SqlValue>> {
        let sql = self.prepare("fetch_list", query.into())?;
        self.run("fetch_list", &sql, &[], ListBuilder::default()).await
    }

    /// Run a query and collect `(column 0, column 1)` per row.
    /// Single-column rows yield `(column 0, column 0)`.
    pub async fn fetch_key_value_list(
        &mut self,
        query: impl Into<Query>,
    ) -> Result<Vec<(SqlValue, SqlValue)>> {
        let sql = self.prepare("fetch_key_value_list", query.into())?;
        self.run("fetch_key_value_list", &sql, &[], KeyValueBuilder::default()).await
    }

    /// Run a query and keep the first column of the first row.
    /// `None` means the query returned no rows.
    pub async fn fetch_scalar(&mut self, query: impl Into<Query>) -> Result<Option<SqlValue>> {
        let sql = self.prepare("fetch_scalar", query.into())?;
        self.run("fetch_scalar", &sql, &[], ScalarBuilder::default()).await
    }

    /// Column names of a table, in catalog order.
    ///
    /// The name must be a regular identifier and is passed to the catalog
    /// query as a parameter, never spliced into the SQL text.
    pub async fn describe_table(&mut self, table_name: &str) -> Result<Vec<String>> {
        let table_name = validate_identifier(table_name)?;
        let names = self
            .run(
                "describe_table",
                DESCRIBE_TABLE_SQL,
                &[SqlValue::from(table_name)],
                ListBuilder::default(),
            )
            .await?;

        names
            .into_iter()
            .map(|name| match name {
                SqlValue::Text(name) => Ok(name),
                other => Err(RdaoError::QueryFailed(format!(
                    "catalog reported a non-text column name: {other:?}"
                ))),
            })
            .collect()
    }

    /// Run a write or DDL statement and report rows affected and last identity.
    ///
    /// The outcome is returned and also kept as [`last_outcome`](Self::last_outcome).
    /// A failed statement leaves the previous outcome in place.
    pub async fn execute_single(&mut self, query: impl Into<Query>) -> Result<ExecOutcome> {
        let sql = self.prepare("execute_single", query.into())?;
        let sql = format!("{sql}{OUTCOME_QUERY}");
        let outcome = self.run("execute_single", &sql, &[], OutcomeBuilder::default()).await?;

        if self.config.debug {
            debug!(
                op = "execute_single",
                rows_affected = ?outcome.rows_affected,
                last_identity = ?outcome.last_identity,
                "outcome captured"
            );
        }
        self.last_outcome = Some(outcome.clone());
        Ok(outcome)
    }

    /// Run several statements in order, stopping at the first failure.
    pub async fn execute<I>(&mut self, statements: I) -> Result<Vec<ExecOutcome>>
    where
        I: IntoIterator,
        I::Item: Into<Query>,
    {
        self.batch().extend(statements).execute().await
    }

    /// Start collecting statements to run together.
    pub fn batch(&mut self) -> Batch<'_> {
        Batch::new(self)
    }

    pub async fn open_then<F, R>(target: &str, config: ExecutorConfig, on_complete: F) -> R
    where
        F: FnOnce(Result<Self>) -> R,
    {
        on_complete(Self::open(target, config).await)
    }

    pub async fn close_then<F, R>(self, on_complete: F) -> R
    where
        F: FnOnce(Result<()>) -> R,
    {
        on_complete(self.close().await)
    }

    pub async fn fetch_table_then<F, R>(&mut self, query: impl Into<Query>, on_complete: F) -> R
    where
        F: FnOnce(Result<DataTable>) -> R,
    {
        on_complete(self.fetch_table(query).await)
    }

    pub async fn fetch_list_then<F, R>(&mut self, query: impl Into<Query>, on_complete: F) -> R
    where
        F: FnOnce(Result<Vec<SqlValue>>) -> R,
    {
        on_complete(self.fetch_list(query).await)
    }

    pub async fn fetch_key_value_list_then<F, R>(
        &mut self,
        query: impl Into<Query>,
        on_complete: F,
    ) -> R
    where
        F: FnOnce(Result<Vec<(SqlValue, SqlValue)>>) -> R,
    {
        on_complete(self.fetch_key_value_list(query).await)
    }

    pub async fn fetch_scalar_then<F, R>(&mut self, query: impl Into<Query>, on_complete: F) -> R
    where
        F: FnOnce(Result<Option<SqlValue>>) -> R,
    {
        on_complete(self.fetch_scalar(query).await)
    }

    pub async fn describe_table_then<F, R>(&mut self, table_name: &str, on_complete: F) -> R
    where
        F: FnOnce(Result<Vec<String>>) -> R,
    {
        on_complete(self.describe_table(table_name).await)
    }

    pub async fn execute_single_then<F, R>(&mut self, query: impl Into<Query>, on_complete: F) -> R
    where
        F: FnOnce(Result<ExecOutcome>) -> R,
    {
        on_complete(self.execute_single(query).await)
    }

    pub async fn execute_then<I, F, R>(&mut self, statements: I, on_complete: F) -> R
    where
        I: IntoIterator,
        I::Item: Into<Query>,
        F: FnOnce(Result<Vec<ExecOutcome>>) -> R,
    {
        on_complete(self.execute(statements).await)
    }

    fn prepare(&self, op: &'static str, query: Query) -> Result<String> {
        let resolved = query.resolve();
        if let Err(e) = &resolved {
            if self.config.debug {
                warn!(op, error = %e, "could not resolve query");
            }
        }
        resolved
    }

    /// Submit one statement and shape its rows with `sink`.
    /// On error the sink is dropped along with anything it collected.
    async fn run<A: Accumulator>(
        &mut self,
        op: &'static str,
        sql: &str,
        params: &[SqlValue],
        mut sink: A,
    ) -> Result<A::Output> {
        let started = Instant::now();
        if self.config.debug {
            debug!(op, sql, "executing");
        }

        let result = self.driver.execute(sql, params, &mut sink).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(()) => {
                if self.config.debug {
                    debug!(op, elapsed_ms, "completed");
                }
                Ok(sink.finish())
            }
            Err(e) => {
                if self.config.debug {
                    warn!(op, sql, error = %e, elapsed_ms, "failed");
                }
                Err(e)
            }
        }
    }
}
