use tracing::debug;

use super::config::MssqlClient;
use super::params::build_exec_statement;
use super::query::build_recordsets;
use crate::error::SqlTestError;
use crate::results::Recordsets;
use crate::types::RowValues;

/// Execute a stored procedure with named inputs.
///
/// # Errors
///
/// Returns `SqlTestError::ParameterError` for an invalid input name and
/// `SqlTestError::ExecutionError` if execution or result processing fails.
pub async fn execute_procedure(
    client: &mut MssqlClient,
    proc_name: &str,
    inputs: &[(String, RowValues)],
    multiple: bool,
) -> Result<Recordsets, SqlTestError> {
    let sql = build_exec_statement(proc_name, inputs.iter().map(|(name, _)| name.as_str()))?;
    let values: Vec<RowValues> = inputs.iter().map(|(_, value)| value.clone()).collect();

    debug!(%sql, inputs = values.len(), "SQL Server procedure call");
    build_recordsets(client, &sql, &values, multiple).await
}

/// Execute literal SQL text.
///
/// # Errors
///
/// Returns `SqlTestError::ExecutionError` if execution or result processing fails.
pub async fn execute_query(
    client: &mut MssqlClient,
    text: &str,
    multiple: bool,
) -> Result<Recordsets, SqlTestError> {
    build_recordsets(client, text, &[], multiple).await
}
