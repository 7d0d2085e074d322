//! Helper utilities for testing and development.

use std::sync::Arc;

use crate::results::{CustomDbRow, ResultSet};
use crate::types::RowValues;

/// Create a test row with the given column names and values.
#[must_use]
pub fn create_test_row(column_names: Vec<String>, values: Vec<RowValues>) -> CustomDbRow {
    CustomDbRow::new(Arc::new(column_names), values)
}

/// A one-row, one-column result set.
#[must_use]
pub fn single_value_set(column: &str, value: RowValues) -> ResultSet {
    let mut rs = ResultSet::with_capacity(1);
    rs.set_column_names(Arc::new(vec![column.to_string()]));
    rs.add_row_values(vec![value]);
    rs
}
