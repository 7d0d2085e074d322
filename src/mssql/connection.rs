use async_trait::async_trait;

use super::client::create_mssql_client;
use super::config::{MssqlClient, MssqlOptions};
use super::executor::{execute_procedure, execute_query};
use crate::driver::{Connection, Driver, Request};
use crate::error::SqlTestError;
use crate::results::Recordsets;
use crate::types::RowValues;

/// Opens `tiberius` connections from [`MssqlOptions`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MssqlDriver;

#[async_trait]
impl Driver for MssqlDriver {
    type Config = MssqlOptions;
    type Connection = MssqlConnection;

    async fn connect(&self, config: &MssqlOptions) -> Result<MssqlConnection, SqlTestError> {
        let client = create_mssql_client(config).await?;
        Ok(MssqlConnection {
            client: Some(client),
        })
    }
}

/// A single SQL Server connection. Closing drops the client; requests made
/// afterwards fail.
pub struct MssqlConnection {
    client: Option<MssqlClient>,
}

impl MssqlConnection {
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.client.is_some()
    }
}

impl std::fmt::Debug for MssqlConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MssqlConnection")
            .field("open", &self.is_open())
            .finish()
    }
}

#[async_trait]
impl Connection for MssqlConnection {
    fn request(&mut self) -> Box<dyn Request + '_> {
        Box::new(MssqlRequest {
            client: self.client.as_mut(),
            inputs: Vec::new(),
            multiple: false,
        })
    }

    async fn close(&mut self) -> Result<(), SqlTestError> {
        if let Some(client) = self.client.take() {
            client.close().await.map_err(|e| {
                SqlTestError::ConnectionError(format!("SQL Server close error: {e}"))
            })?;
        }
        Ok(())
    }
}

/// Inputs and flags collected for one call on a [`MssqlConnection`].
pub struct MssqlRequest<'a> {
    client: Option<&'a mut MssqlClient>,
    inputs: Vec<(String, RowValues)>,
    multiple: bool,
}

impl<'a> MssqlRequest<'a> {
    fn client(&mut self) -> Result<&mut MssqlClient, SqlTestError> {
        self.client
            .as_deref_mut()
            .ok_or_else(|| SqlTestError::ConnectionError("connection is closed".to_string()))
    }
}

#[async_trait]
impl<'a> Request for MssqlRequest<'a> {
    fn input(&mut self, name: &str, value: RowValues) {
        self.inputs.push((name.to_string(), value));
    }

    fn set_multiple(&mut self, multiple: bool) {
        self.multiple = multiple;
    }

    async fn execute(&mut self, proc_name: &str) -> Result<Recordsets, SqlTestError> {
        let inputs = std::mem::take(&mut self.inputs);
        let multiple = self.multiple;
        execute_procedure(self.client()?, proc_name, &inputs, multiple).await
    }

    async fn query(&mut self, text: &str) -> Result<Recordsets, SqlTestError> {
        let multiple = self.multiple;
        execute_query(self.client()?, text, multiple).await
    }
}
