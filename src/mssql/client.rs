use std::net::ToSocketAddrs;

use tiberius::{Client, SqlBrowser};
use tokio::net::TcpStream;
use tokio_util::compat::TokioAsyncWriteCompatExt;
use tracing::debug;

use super::config::{MssqlClient, MssqlOptions};
use crate::error::SqlTestError;

/// Helper function to create a new MSSQL connection
///
/// Named instances are located through the SQL Browser service; otherwise
/// the server address is resolved and dialled directly.
///
/// # Errors
/// Returns `SqlTestError::ConnectionError` if the MSSQL connection fails.
pub async fn create_mssql_client(opts: &MssqlOptions) -> Result<MssqlClient, SqlTestError> {
    let config = opts.to_tiberius_config();

    let tcp = if opts.instance_name.is_some() {
        TcpStream::connect_named(&config).await.map_err(|e| {
            SqlTestError::ConnectionError(format!("SQL Browser lookup failed: {e}"))
        })?
    } else {
        let port = opts.port_or_default();
        let addr_iter = (opts.server.as_str(), port).to_socket_addrs().map_err(|e| {
            SqlTestError::ConnectionError(format!("Failed to resolve server address: {e}"))
        })?;

        let server_addr = addr_iter.into_iter().next().ok_or_else(|| {
            SqlTestError::ConnectionError(format!("No valid address found for {}", opts.server))
        })?;

        debug!(%server_addr, "dialling SQL Server");
        TcpStream::connect(server_addr).await.map_err(|e| {
            SqlTestError::ConnectionError(format!("TCP connection error: {e}"))
        })?
    };

    tcp.set_nodelay(true)
        .map_err(|e| SqlTestError::ConnectionError(format!("TCP configuration error: {e}")))?;

    Client::connect(config, tcp.compat_write()).await.map_err(|e| {
        SqlTestError::ConnectionError(format!("SQL Server connection error: {e}"))
    })
}
