//! Ordered execution of SQL Server queries and stored procedures with
//! per-step assertions.
//!
//! A [`TestCompiler`] owns one connection and runs prep queries and test
//! steps strictly one after another, handing each step's outcome to its
//! assertion callback. Failures never stop the run; the compile future
//! resolves once the queue is empty.

pub mod compiler;
pub mod config;
pub mod driver;
pub mod error;
pub mod plan;
pub mod prelude;
pub mod results;
pub mod step;
pub mod types;

#[cfg(feature = "mssql")]
pub mod mssql;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use compiler::{CompileReport, TestCompiler};
pub use config::{ErrorCallback, TestCompilerBuilder, TestConfig, default_error_callback};
pub use driver::{Connection, Driver, Request};
pub use error::SqlTestError;
pub use plan::TestPlan;
pub use results::{CustomDbRow, Recordsets, ResultSet};
pub use step::{AssertionCallback, ProcArgs, QueryText, StepKind, StepSpec, TestStep};
pub use types::RowValues;
