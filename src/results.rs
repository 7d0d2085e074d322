pub mod result_set;
pub mod row;

pub use result_set::ResultSet;
pub use row::CustomDbRow;

/// Every result set produced by one dispatched procedure or query, in the
/// order the server returned them.
pub type Recordsets = Vec<ResultSet>;
