//! The database driver seam.
//!
//! The compiler only needs three capabilities from a driver: open a
//! connection from an opaque configuration, hand out fresh single-use
//! requests on that connection, and close it again. The SQL Server backend in
//! [`crate::mssql`] implements these over `tiberius`; tests use the recording
//! driver in `test_utils`.

use async_trait::async_trait;

use crate::error::SqlTestError;
use crate::results::Recordsets;
use crate::types::RowValues;

/// A single-use request acquired from an open connection.
#[async_trait]
pub trait Request: Send {
    /// Bind a named input parameter.
    fn input(&mut self, name: &str, value: RowValues);

    /// Return every result set instead of only the first one.
    fn set_multiple(&mut self, multiple: bool);

    /// Invoke a stored procedure with the bound inputs.
    ///
    /// # Errors
    /// Returns the driver's failure for the dispatched call.
    async fn execute(&mut self, proc_name: &str) -> Result<Recordsets, SqlTestError>;

    /// Run literal SQL text.
    ///
    /// # Errors
    /// Returns the driver's failure for the dispatched query.
    async fn query(&mut self, text: &str) -> Result<Recordsets, SqlTestError>;
}

/// An open connection handing out requests.
#[async_trait]
pub trait Connection: Send {
    /// Acquire a fresh request. Requests are never reused across calls.
    fn request(&mut self) -> Box<dyn Request + '_>;

    /// Release the underlying connection. Requests made afterwards fail with
    /// [`SqlTestError::ConnectionError`].
    ///
    /// # Errors
    /// Returns an error if the driver fails to shut the connection down cleanly.
    async fn close(&mut self) -> Result<(), SqlTestError>;
}

/// Opens connections from a driver-specific configuration.
#[async_trait]
pub trait Driver: Send + Sync {
    type Config: Send + Sync;
    type Connection: Connection;

    /// # Errors
    /// Returns [`SqlTestError::ConnectionError`] (or a driver error) if the
    /// connection cannot be established.
    async fn connect(&self, config: &Self::Config) -> Result<Self::Connection, SqlTestError>;
}
