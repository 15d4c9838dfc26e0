use crate::error::Result;
use crate::executor::StatementExecutor;
use crate::query::Query;
use crate::types::ExecOutcome;

/// Statements collected for sequential execution on one executor.
/// Created with [`StatementExecutor::batch`].
pub struct Batch<'a> {
    executor: &'a mut StatementExecutor,
    statements: Vec<Query>,
}

impl<'a> Batch<'a> {
    pub(crate) fn new(executor: &'a mut StatementExecutor) -> Self {
        Self {
            executor,
            statements: Vec::new(),
        }
    }

    /// Add a statement to the batch.
    pub fn add(mut self, statement: impl Into<Query>) -> Self {
        self.statements.push(statement.into());
        self
    }

    /// Add several statements to the batch.
    pub fn extend<I>(mut self, statements: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Query>,
    {
        self.statements.extend(statements.into_iter().map(Into::into));
        self
    }

    /// Run every statement through `execute_single`, in order.
    /// Stops at the first failure; statements after it are not submitted.
    pub async fn execute(self) -> Result<Vec<ExecOutcome>> {
        let mut outcomes = Vec::with_capacity(self.statements.len());
        for statement in self.statements {
            outcomes.push(self.executor.execute_single(statement).await?);
        }
        Ok(outcomes)
    }
}
