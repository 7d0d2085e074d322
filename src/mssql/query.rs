use std::sync::Arc;

use chrono::NaiveDateTime;
use futures_util::TryStreamExt;
use tiberius::{Query, QueryItem, Row};

use super::config::MssqlClient;
use crate::error::SqlTestError;
use crate::results::{Recordsets, ResultSet};
use crate::types::RowValues;

/// Run `sql` with positional parameters and collect its result sets.
///
/// The whole stream is drained; with `multiple` unset only the first result
/// set is kept. Result sets without rows keep their column names.
///
/// # Errors
/// Returns `SqlTestError::ExecutionError` if the server rejects the batch or
/// a row cannot be read.
pub async fn build_recordsets(
    client: &mut MssqlClient,
    sql: &str,
    params: &[RowValues],
    multiple: bool,
) -> Result<Recordsets, SqlTestError> {
    let query = bind_query_params(sql, params);

    let mut stream = query.query(client).await.map_err(|e| {
        SqlTestError::ExecutionError(format!("SQL Server query error: {e}"))
    })?;

    let mut recordsets: Recordsets = Vec::new();
    while let Some(item) = stream.try_next().await.map_err(|e| {
        SqlTestError::ExecutionError(format!("SQL Server row fetch error: {e}"))
    })? {
        match item {
            QueryItem::Metadata(meta) => {
                let column_names: Vec<String> =
                    meta.columns().iter().map(|col| col.name().to_string()).collect();
                let mut result_set = ResultSet::with_capacity(10);
                result_set.set_column_names(Arc::new(column_names));
                recordsets.push(result_set);
            }
            QueryItem::Row(row) => {
                let result_set = recordsets.last_mut().ok_or_else(|| {
                    SqlTestError::ExecutionError("row received before column metadata".to_string())
                })?;
                let col_count = result_set.get_column_names().map_or(0, |names| names.len());
                result_set.add_row_values(row_values(&row, col_count));
            }
        }
    }

    if !multiple {
        recordsets.truncate(1);
    }

    Ok(recordsets)
}

fn row_values(row: &Row, col_count: usize) -> Vec<RowValues> {
    (0..col_count)
        .map(|i| extract_value(row, i).unwrap_or(RowValues::Null))
        .collect()
}

/// Extract a value from a row at a specific index, trying the common SQL
/// Server types in turn. `None` means NULL or an unsupported type.
fn extract_value(row: &Row, idx: usize) -> Option<RowValues> {
    if let Ok(Some(val)) = row.try_get::<i32, _>(idx) {
        return Some(RowValues::Int(i64::from(val)));
    }

    if let Ok(Some(val)) = row.try_get::<i64, _>(idx) {
        return Some(RowValues::Int(val));
    }

    if let Ok(Some(val)) = row.try_get::<i16, _>(idx) {
        return Some(RowValues::Int(i64::from(val)));
    }

    if let Ok(Some(val)) = row.try_get::<u8, _>(idx) {
        return Some(RowValues::Int(i64::from(val)));
    }

    if let Ok(Some(val)) = row.try_get::<f32, _>(idx) {
        return Some(RowValues::Float(f64::from(val)));
    }

    if let Ok(Some(val)) = row.try_get::<f64, _>(idx) {
        return Some(RowValues::Float(val));
    }

    if let Ok(Some(val)) = row.try_get::<bool, _>(idx) {
        return Some(RowValues::Bool(val));
    }

    if let Ok(Some(val)) = row.try_get::<NaiveDateTime, _>(idx) {
        return Some(RowValues::Timestamp(val));
    }

    if let Ok(Some(val)) = row.try_get::<&str, _>(idx) {
        return Some(RowValues::Text(val.to_string()));
    }

    if let Ok(Some(val)) = row.try_get::<&[u8], _>(idx) {
        return Some(RowValues::Blob(val.to_vec()));
    }

    None
}

/// Bind parameters directly to the query for SQL Server
pub fn bind_query_params<'a>(sql: &'a str, params: &[RowValues]) -> Query<'a> {
    let mut query = Query::new(sql);

    for param in params {
        match param {
            RowValues::Int(i) => query.bind(*i),
            RowValues::Float(f) => query.bind(*f),
            RowValues::Text(s) => query.bind(s.clone()),
            RowValues::Bool(b) => query.bind(*b),
            RowValues::Timestamp(dt) => query.bind(*dt),
            RowValues::Null => query.bind(Option::<String>::None),
            RowValues::JSON(jsval) => query.bind(jsval.to_string()),
            RowValues::Blob(bytes) => query.bind(bytes.clone()),
        }
    }

    query
}
