use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{TestCompilerBuilder, TestConfig};
use crate::driver::{Connection, Driver, Request};
use crate::error::SqlTestError;
use crate::results::Recordsets;
use crate::step::{ProcArgs, QueryText, StepKind, TestStep};

/// Tally of one compile run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileReport {
    /// Procedures and queries sent to the driver.
    pub dispatched: usize,
    /// Dispatched operations that came back with an error.
    pub failed: usize,
    /// Steps with nothing to run.
    pub skipped: usize,
    /// `queries` groups spliced into the queue.
    pub expanded: usize,
}

impl CompileReport {
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.dispatched - self.failed
    }
}

/// Runs setup queries, stored procedures and plain queries one after another
/// over a single connection, handing each outcome to the step's assertion.
///
/// ```rust,no_run
/// use easy_sql_test::prelude::*;
///
/// # async fn demo() -> Result<(), SqlTestError> {
/// let opts = MssqlOptions::builder("localhost", "testing", "sa", "secret").finish();
/// let mut compiler = TestCompiler::builder(MssqlDriver).db_config(opts).build()?;
/// compiler.connection_open().await?;
///
/// let report = compiler
///     .compile_test(
///         ["DELETE FROM users"],
///         vec![
///             TestStep::stor_proc_with_args("dbo.AddUser", ProcArgs::new().arg("name", "alice"))
///                 .with_assertion(|outcome| assert!(outcome.is_ok())),
///             TestStep::query("SELECT COUNT(*) AS n FROM users").with_assertion(|outcome| {
///                 let sets = outcome.expect("count query");
///                 assert_eq!(sets[0].results[0].get("n"), Some(&RowValues::Int(1)));
///             }),
///         ],
///     )
///     .await?;
/// assert_eq!(report.failed, 0);
///
/// compiler.cleanup().await?;
/// compiler.connection_close().await?;
/// # Ok(()) }
/// ```
pub struct TestCompiler<D: Driver> {
    driver: D,
    config: TestConfig<D::Config>,
    connection: Option<D::Connection>,
}

impl<D: Driver> TestCompiler<D> {
    #[must_use]
    pub fn builder(driver: D) -> TestCompilerBuilder<D> {
        TestCompilerBuilder::new(driver)
    }

    pub(crate) fn from_parts(driver: D, config: TestConfig<D::Config>) -> Self {
        Self {
            driver,
            config,
            connection: None,
        }
    }

    /// Open the connection described by the configured `db_config`.
    ///
    /// A connection that is already open is closed first.
    ///
    /// # Errors
    /// Returns the driver's connect failure.
    pub async fn connection_open(&mut self) -> Result<(), SqlTestError> {
        if let Some(mut previous) = self.connection.take() {
            previous.close().await?;
        }

        let connection = self.driver.connect(&self.config.db_config).await?;
        self.connection = Some(connection);
        info!("connection opened");
        Ok(())
    }

    /// Close the connection if one is open.
    ///
    /// # Errors
    /// Returns the driver's failure while shutting the connection down.
    pub async fn connection_close(&mut self) -> Result<(), SqlTestError> {
        if let Some(mut connection) = self.connection.take() {
            connection.close().await?;
            info!("connection closed");
        }
        Ok(())
    }

    #[must_use]
    pub fn connection(&self) -> Option<&D::Connection> {
        self.connection.as_ref()
    }

    #[must_use]
    pub fn db_config(&self) -> &D::Config {
        &self.config.db_config
    }

    #[must_use]
    pub fn config(&self) -> &TestConfig<D::Config> {
        &self.config
    }

    fn connection_mut(&mut self) -> Result<&mut D::Connection, SqlTestError> {
        self.connection
            .as_mut()
            .ok_or_else(|| SqlTestError::ConnectionError("connection is not open".to_string()))
    }

    fn prepare_stor_proc(
        &mut self,
        name: &str,
        args: &ProcArgs,
    ) -> Result<Box<dyn Request + '_>, SqlTestError> {
        if name.is_empty() {
            return Err(SqlTestError::MissingArgument(
                "execute_stor_proc() requires a stored procedure name".to_string(),
            ));
        }

        let mut request = self.connection_mut()?.request();
        for (arg, value) in args.present() {
            request.input(arg, value.clone());
        }
        request.set_multiple(true);
        Ok(request)
    }

    fn prepare_query(&mut self, text: &str) -> Result<Box<dyn Request + '_>, SqlTestError> {
        if text.is_empty() {
            return Err(SqlTestError::MissingArgument(
                "query() requires query text".to_string(),
            ));
        }

        Ok(self.connection_mut()?.request())
    }

    /// Call a stored procedure on a fresh request, binding every present
    /// argument and returning all result sets.
    ///
    /// # Errors
    /// Returns [`SqlTestError::MissingArgument`] for an empty name and
    /// [`SqlTestError::ConnectionError`] without an open connection, both
    /// before a request is acquired. Otherwise returns the driver's failure.
    pub async fn execute_stor_proc(
        &mut self,
        name: &str,
        args: &ProcArgs,
    ) -> Result<Recordsets, SqlTestError> {
        let mut request = self.prepare_stor_proc(name, args)?;
        request.execute(name).await
    }

    /// Run literal SQL text on a fresh request.
    ///
    /// # Errors
    /// Returns [`SqlTestError::MissingArgument`] for empty text and
    /// [`SqlTestError::ConnectionError`] without an open connection, both
    /// before a request is acquired. Otherwise returns the driver's failure.
    pub async fn query(&mut self, text: &str) -> Result<Recordsets, SqlTestError> {
        let mut request = self.prepare_query(text)?;
        request.query(text).await
    }

    /// Turn query texts into steps whose failures go to the error callback.
    ///
    /// Blank and absent texts are dropped; order is kept.
    pub fn queries_to_steps<I>(&self, queries: I) -> Vec<TestStep>
    where
        I: IntoIterator,
        I::Item: QueryText,
    {
        queries
            .into_iter()
            .filter_map(QueryText::into_query_text)
            .map(|text| {
                let on_error = Arc::clone(&self.config.error_callback);
                TestStep::new(StepKind::Query { text }).with_assertion(move |outcome| {
                    if let Err(err) = outcome {
                        on_error(err);
                    }
                })
            })
            .collect()
    }

    /// Run `prep_queries` and then `test_steps`, strictly in order.
    ///
    /// The returned future resolves once, after the last step's assertion
    /// has returned.
    ///
    /// # Errors
    /// See [`TestCompiler::compile`].
    pub async fn compile_test<P, S>(
        &mut self,
        prep_queries: P,
        test_steps: S,
    ) -> Result<CompileReport, SqlTestError>
    where
        P: IntoIterator,
        P::Item: QueryText,
        S: IntoIterator<Item = TestStep>,
    {
        let mut queue: VecDeque<TestStep> = self.queries_to_steps(prep_queries).into();
        queue.extend(test_steps);
        self.compile(queue).await
    }

    /// Drain `steps` front to back.
    ///
    /// Each procedure or query is awaited and its outcome handed to the
    /// step's assertion before the next step starts. Operation failures never
    /// stop the run. `queries` groups are expanded in place; their own
    /// assertion is dropped uncalled, as is that of a skipped step.
    ///
    /// # Errors
    /// Returns early only when a step cannot be dispatched at all: an empty
    /// procedure name or query text ([`SqlTestError::MissingArgument`]), or no
    /// open connection ([`SqlTestError::ConnectionError`]).
    pub async fn compile<I>(&mut self, steps: I) -> Result<CompileReport, SqlTestError>
    where
        I: IntoIterator<Item = TestStep>,
    {
        let mut queue: VecDeque<TestStep> = steps.into_iter().collect();
        let mut report = CompileReport::default();

        while let Some(step) = queue.pop_front() {
            let (kind, assertion) = step.into_parts();

            let outcome = match kind {
                StepKind::Queries(texts) => {
                    let expanded = self.queries_to_steps(texts);
                    debug!(count = expanded.len(), "expanding queries group");
                    let rest = std::mem::take(&mut queue);
                    queue.extend(expanded);
                    queue.extend(rest);
                    report.expanded += 1;
                    continue;
                }
                StepKind::Skip => {
                    debug!("skipping step with nothing to run");
                    report.skipped += 1;
                    continue;
                }
                StepKind::StorProc { name, args } => {
                    debug!(procedure = %name, "executing stored procedure");
                    let mut request = self.prepare_stor_proc(&name, &args)?;
                    request.execute(&name).await
                }
                StepKind::Query { text } => {
                    debug!(query = %text, "executing query");
                    let mut request = self.prepare_query(&text)?;
                    request.query(&text).await
                }
            };

            report.dispatched += 1;
            if let Err(err) = &outcome {
                report.failed += 1;
                debug!(error = %err, "step failed");
            }

            if let Some(assertion) = assertion {
                assertion(outcome);
            }
        }

        info!(
            dispatched = report.dispatched,
            failed = report.failed,
            skipped = report.skipped,
            "test steps finished"
        );
        Ok(report)
    }

    /// Run the configured cleanup query.
    ///
    /// Without one this returns `Ok(None)` right away and touches nothing.
    ///
    /// # Errors
    /// Passes the cleanup query's failure through unchanged.
    pub async fn cleanup(&mut self) -> Result<Option<Recordsets>, SqlTestError> {
        let Some(cleanup_query) = self.config.cleanup_query.clone() else {
            return Ok(None);
        };

        self.query(&cleanup_query).await.map(Some)
    }
}
