//! Convenient imports for common functionality.

pub use crate::compiler::{CompileReport, TestCompiler};
pub use crate::config::{ErrorCallback, TestCompilerBuilder};
pub use crate::driver::{Connection, Driver, Request};
pub use crate::error::SqlTestError;
pub use crate::plan::TestPlan;
pub use crate::results::{CustomDbRow, Recordsets, ResultSet};
pub use crate::step::{ProcArgs, StepKind, StepSpec, TestStep};
pub use crate::types::RowValues;

#[cfg(feature = "mssql")]
pub use crate::mssql::{MssqlDriver, MssqlOptions};
