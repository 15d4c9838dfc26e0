use crate::types::SqlValue;

/// Rows affected and last generated identity reported after a write statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecOutcome {
    /// `@@ROWCOUNT`, or `None` when the engine reported NULL.
    pub rows_affected: Option<i64>,
    /// `@@IDENTITY` as the engine reported it, `Null` when nothing was generated.
    pub last_identity: SqlValue,
}

impl ExecOutcome {
    /// The identity as an integer, when one was generated.
    pub fn last_insert_id(&self) -> Option<i64> {
        self.last_identity.as_i64()
    }
}

impl Default for ExecOutcome {
    fn default() -> Self {
        Self {
            rows_affected: None,
            last_identity: SqlValue::Null,
        }
    }
}
