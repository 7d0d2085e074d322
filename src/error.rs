use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlTestError {
    #[cfg(feature = "mssql")]
    #[error(transparent)]
    MssqlError(#[from] tiberius::error::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Missing argument: {0}")]
    MissingArgument(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Test plan error: {0}")]
    PlanError(String),
}

impl SqlTestError {
    /// True for failures reported by the database for a dispatched operation.
    #[must_use]
    pub fn is_operation_error(&self) -> bool {
        match self {
            SqlTestError::ExecutionError(_) => true,
            #[cfg(feature = "mssql")]
            SqlTestError::MssqlError(_) => true,
            _ => false,
        }
    }
}
