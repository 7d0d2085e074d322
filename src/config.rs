use std::fmt;
use std::sync::Arc;

use crate::compiler::TestCompiler;
use crate::driver::Driver;
use crate::error::SqlTestError;

/// Receives failures of steps generated from plain query texts.
pub type ErrorCallback = Arc<dyn Fn(SqlTestError) + Send + Sync>;

/// The handler used when no error callback is configured: log and move on.
#[must_use]
pub fn default_error_callback() -> ErrorCallback {
    Arc::new(|err| tracing::error!(error = %err, "query step failed"))
}

/// Settings fixed for the lifetime of one [`TestCompiler`].
pub struct TestConfig<C> {
    pub(crate) db_config: C,
    pub(crate) error_callback: ErrorCallback,
    pub(crate) cleanup_query: Option<String>,
}

impl<C> TestConfig<C> {
    #[must_use]
    pub fn db_config(&self) -> &C {
        &self.db_config
    }

    #[must_use]
    pub fn cleanup_query(&self) -> Option<&str> {
        self.cleanup_query.as_deref()
    }
}

impl<C: fmt::Debug> fmt::Debug for TestConfig<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestConfig")
            .field("db_config", &self.db_config)
            .field("cleanup_query", &self.cleanup_query)
            .finish_non_exhaustive()
    }
}

/// Fluent builder for a [`TestCompiler`].
///
/// ```rust,no_run
/// use easy_sql_test::prelude::*;
///
/// # fn demo() -> Result<(), SqlTestError> {
/// let opts = MssqlOptions::builder("localhost", "testing", "sa", "secret").finish();
/// let compiler = TestCompiler::builder(MssqlDriver)
///     .db_config(opts)
///     .cleanup_query("DELETE FROM users")
///     .error_callback(|err| eprintln!("prep failed: {err}"))
///     .build()?;
/// # let _ = compiler;
/// # Ok(()) }
/// ```
pub struct TestCompilerBuilder<D: Driver> {
    driver: D,
    db_config: Option<D::Config>,
    error_callback: Option<ErrorCallback>,
    cleanup_query: Option<String>,
}

impl<D: Driver> TestCompilerBuilder<D> {
    #[must_use]
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            db_config: None,
            error_callback: None,
            cleanup_query: None,
        }
    }

    /// Connection parameters handed to the driver on open. Required.
    #[must_use]
    pub fn db_config(mut self, db_config: D::Config) -> Self {
        self.db_config = Some(db_config);
        self
    }

    #[must_use]
    pub fn error_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(SqlTestError) + Send + Sync + 'static,
    {
        self.error_callback = Some(Arc::new(callback));
        self
    }

    /// Query run by [`TestCompiler::cleanup`]. Empty text means none.
    #[must_use]
    pub fn cleanup_query(mut self, query: impl Into<String>) -> Self {
        let query = query.into();
        self.cleanup_query = (!query.is_empty()).then_some(query);
        self
    }

    /// # Errors
    /// Returns [`SqlTestError::ConfigError`] if no `db_config` was given.
    pub fn build(self) -> Result<TestCompiler<D>, SqlTestError> {
        let db_config = self.db_config.ok_or_else(|| {
            SqlTestError::ConfigError("easy-sql-test: dbConfig required".to_string())
        })?;

        let config = TestConfig {
            db_config,
            error_callback: self.error_callback.unwrap_or_else(default_error_callback),
            cleanup_query: self.cleanup_query,
        };

        Ok(TestCompiler::from_parts(self.driver, config))
    }
}
