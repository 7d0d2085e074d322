use clap::Parser;
use std::path::PathBuf;

use easy_sql_test::mssql::MssqlOptions;

pub(crate) const PASSWORD_ENV: &str = "EASY_SQL_TEST_PASSWORD";

#[derive(Parser, Debug)]
#[command(author, version, about = "Run a JSON test plan against SQL Server")]
pub(crate) struct Args {
    /// Test plan file
    pub(crate) plan: PathBuf,
    #[arg(long, default_value = "localhost")]
    pub(crate) server: String,
    #[arg(long)]
    pub(crate) database: String,
    #[arg(long, default_value = "sa")]
    pub(crate) user: String,
    /// Falls back to the EASY_SQL_TEST_PASSWORD environment variable
    #[arg(long)]
    pub(crate) password: Option<String>,
    #[arg(long)]
    pub(crate) port: Option<u16>,
    #[arg(long)]
    pub(crate) instance_name: Option<String>,
    /// Query run after the plan, whether or not it passed
    #[arg(long)]
    pub(crate) cleanup_query: Option<String>,
    #[arg(long)]
    pub(crate) verbose: bool,
}

impl Args {
    pub(crate) fn mssql_options(&self) -> MssqlOptions {
        let password = self
            .password
            .clone()
            .or_else(|| std::env::var(PASSWORD_ENV).ok())
            .unwrap_or_default();

        MssqlOptions::builder(&self.server, &self.database, &self.user, password)
            .port(self.port)
            .instance_name(self.instance_name.clone())
            .finish()
    }
}
