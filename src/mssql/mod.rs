// SQL Server backend for the driver seam.
//
// - config: connection options and their tiberius translation
// - client: raw client creation
// - params: procedure parameter naming and EXEC statement building
// - query: parameter binding and result-set extraction
// - executor: stored procedure and query execution against a client
// - connection: the `Driver`, `Connection` and `Request` implementations

pub mod client;
pub mod config;
pub mod connection;
pub mod executor;
pub mod params;
pub mod query;

pub use client::create_mssql_client;
pub use config::{MssqlClient, MssqlOptions, MssqlOptionsBuilder};
pub use connection::{MssqlConnection, MssqlDriver, MssqlRequest};
pub use executor::{execute_procedure, execute_query};
pub use query::build_recordsets;
