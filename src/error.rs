use thiserror::Error;

/// Error type for mssql-rdao operations
#[derive(Debug, Error)]
pub enum RdaoError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Disconnect failed: {0}")]
    DisconnectFailed(String),

    #[error("Connection is not open")]
    NotConnected,

    #[error("Template error: {0}")]
    Template(String),

    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Expected {expected} row(s), got {actual}")]
    UnexpectedRowCount { expected: usize, actual: usize },

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for mssql-rdao operations
pub type Result<T> = std::result::Result<T, RdaoError>;
