mod args;

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use clap::Parser;
use tracing::Level;

use easy_sql_test::mssql::MssqlDriver;
use easy_sql_test::{SqlTestError, TestCompiler, TestPlan};

use crate::args::Args;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    match run(args).await {
        Ok(0) => ExitCode::SUCCESS,
        Ok(failed) => {
            tracing::error!(failed, "test plan finished with failures");
            ExitCode::FAILURE
        }
        Err(err) => {
            tracing::error!(error = %err, "test plan aborted");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<usize, SqlTestError> {
    let plan = TestPlan::from_path(&args.plan)?;
    let prep_failures = Arc::new(AtomicUsize::new(0));

    let mut builder = TestCompiler::builder(MssqlDriver)
        .db_config(args.mssql_options())
        .error_callback({
            let prep_failures = Arc::clone(&prep_failures);
            move |err| {
                prep_failures.fetch_add(1, Ordering::Relaxed);
                tracing::error!(error = %err, "prep query failed");
            }
        });
    if let Some(cleanup_query) = &args.cleanup_query {
        builder = builder.cleanup_query(cleanup_query.as_str());
    }
    let mut compiler = builder.build()?;

    compiler.connection_open().await?;

    let (prep_queries, steps) = plan.into_steps();
    let outcome = compiler.compile_test(prep_queries, steps).await;

    let cleanup = compiler.cleanup().await;
    compiler.connection_close().await?;

    let report = outcome?;
    if let Err(err) = cleanup {
        tracing::error!(error = %err, "cleanup query failed");
        return Ok(report.failed + 1);
    }

    tracing::info!(
        dispatched = report.dispatched,
        failed = report.failed,
        skipped = report.skipped,
        prep_failures = prep_failures.load(Ordering::Relaxed),
        "test plan complete"
    );
    Ok(report.failed)
}
