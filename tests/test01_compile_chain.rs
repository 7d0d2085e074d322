mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use common::{entries, new_log, open_compiler, recorder};
use easy_sql_test::test_utils::{CapturedLogs, RecordingDriver};
use easy_sql_test::{CompileReport, ProcArgs, SqlTestError, StepKind, TestCompiler, TestStep};

#[tokio::test]
async fn mixed_chain_runs_in_queue_order() -> Result<(), SqlTestError> {
    let driver = RecordingDriver::new();
    let mut compiler = open_compiler(&driver).await;
    let log = new_log();

    let report = compiler
        .compile(vec![
            TestStep::stor_proc("a").with_assertion(recorder(&log, "a")),
            TestStep::query("b").with_assertion(recorder(&log, "b")),
            TestStep::stor_proc("e").with_assertion(recorder(&log, "e")),
            TestStep::query("h").with_assertion(recorder(&log, "h")),
        ])
        .await?;

    assert_eq!(driver.dispatched(), vec!["a", "b", "e", "h"]);
    assert_eq!(entries(&log), vec!["a:ok:a", "b:ok:b", "e:ok:e", "h:ok:h"]);
    assert_eq!(
        report,
        CompileReport {
            dispatched: 4,
            failed: 0,
            skipped: 0,
            expanded: 0,
        }
    );
    Ok(())
}

#[tokio::test]
async fn queries_group_expands_before_later_siblings() -> Result<(), SqlTestError> {
    let driver = RecordingDriver::new();
    let mut compiler = open_compiler(&driver).await;
    let log = new_log();

    let report = compiler
        .compile(vec![
            TestStep::query("a").with_assertion(recorder(&log, "a")),
            TestStep::queries(["d", "e"]).with_assertion(recorder(&log, "group")),
            TestStep::stor_proc("f").with_assertion(recorder(&log, "f")),
        ])
        .await?;

    assert_eq!(driver.dispatched(), vec!["a", "d", "e", "f"]);
    assert_eq!(entries(&log), vec!["a:ok:a", "f:ok:f"]);
    assert_eq!(report.expanded, 1);
    assert_eq!(report.dispatched, 4);
    Ok(())
}

#[tokio::test]
async fn step_with_nothing_to_run_is_skipped() -> Result<(), SqlTestError> {
    let driver = RecordingDriver::new();
    let mut compiler = open_compiler(&driver).await;
    let log = new_log();

    let report = compiler
        .compile(vec![
            TestStep::skip().with_assertion(recorder(&log, "skip")),
            TestStep::stor_proc("").with_assertion(recorder(&log, "blank")),
            TestStep::query("x").with_assertion(recorder(&log, "x")),
        ])
        .await?;

    assert_eq!(driver.dispatched(), vec!["x"]);
    assert_eq!(driver.request_count(), 1);
    assert_eq!(entries(&log), vec!["x:ok:x"]);
    assert_eq!(report.skipped, 2);
    Ok(())
}

#[tokio::test]
async fn operation_error_goes_to_assertion_and_chain_continues() -> Result<(), SqlTestError> {
    let driver = RecordingDriver::new().failing_on("b");
    let mut compiler = open_compiler(&driver).await;
    let log = new_log();

    let report = compiler
        .compile(vec![
            TestStep::stor_proc("a").with_assertion(recorder(&log, "a")),
            TestStep::stor_proc("b").with_assertion(recorder(&log, "b")),
            TestStep::query("c").with_assertion(recorder(&log, "c")),
        ])
        .await?;

    assert_eq!(
        entries(&log),
        vec!["a:ok:a", "b:err:SQL execution error: b failed", "c:ok:c"]
    );
    assert_eq!(report.failed, 1);
    assert_eq!(report.succeeded(), 2);
    Ok(())
}

#[tokio::test]
async fn prep_queries_run_first_and_report_to_error_callback() -> Result<(), SqlTestError> {
    let driver = RecordingDriver::new().failing_on("p2");
    let prep_errors = Arc::new(AtomicUsize::new(0));
    let mut compiler = TestCompiler::builder(driver.clone())
        .db_config(common::DB_CONFIG.to_string())
        .error_callback({
            let prep_errors = Arc::clone(&prep_errors);
            move |err| {
                assert!(err.is_operation_error());
                prep_errors.fetch_add(1, Ordering::SeqCst);
            }
        })
        .build()?;
    compiler.connection_open().await?;
    let log = new_log();

    let report = compiler
        .compile_test(
            vec![Some("p1"), None, Some(""), Some("p2")],
            vec![TestStep::query("s").with_assertion(recorder(&log, "s"))],
        )
        .await?;

    assert_eq!(driver.dispatched(), vec!["p1", "p2", "s"]);
    assert_eq!(entries(&log), vec!["s:ok:s"]);
    assert_eq!(prep_errors.load(Ordering::SeqCst), 1);
    assert_eq!(report.failed, 1);
    Ok(())
}

#[tokio::test]
async fn failing_prep_query_is_logged_by_default() -> Result<(), SqlTestError> {
    let (logs, _guard) = CapturedLogs::install();
    let driver = RecordingDriver::new().failing_on("p1");
    let mut compiler = open_compiler(&driver).await;
    let log = new_log();

    let report = compiler
        .compile_test(
            ["p1", "p2"],
            vec![TestStep::query("s").with_assertion(recorder(&log, "s"))],
        )
        .await?;

    assert_eq!(driver.dispatched(), vec!["p1", "p2", "s"]);
    assert_eq!(entries(&log), vec!["s:ok:s"]);
    assert_eq!(report.dispatched, 3);
    assert_eq!(report.failed, 1);
    assert!(logs.contains("ERROR"));
    assert!(logs.contains("query step failed"));
    assert!(logs.contains("p1 failed"));
    Ok(())
}

#[tokio::test]
async fn blank_queries_group_counts_as_skipped() -> Result<(), SqlTestError> {
    let driver = RecordingDriver::new();
    let mut compiler = open_compiler(&driver).await;
    let log = new_log();

    let report = compiler
        .compile(vec![
            TestStep::queries(["", ""]).with_assertion(recorder(&log, "group")),
            TestStep::from_spec(serde_json::from_str(r#"{ "queries": [""] }"#).unwrap()),
            TestStep::query("x").with_assertion(recorder(&log, "x")),
        ])
        .await?;

    assert_eq!(driver.dispatched(), vec!["x"]);
    assert_eq!(entries(&log), vec!["x:ok:x"]);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.expanded, 0);
    Ok(())
}

#[tokio::test]
async fn expanded_group_failures_use_error_callback() -> Result<(), SqlTestError> {
    let driver = RecordingDriver::new().failing_on("d");
    let seen = new_log();
    let mut compiler = TestCompiler::builder(driver.clone())
        .db_config(common::DB_CONFIG.to_string())
        .error_callback({
            let seen = Arc::clone(&seen);
            move |err| seen.lock().unwrap().push(err.to_string())
        })
        .build()?;
    compiler.connection_open().await?;

    compiler
        .compile(vec![TestStep::queries(["d", "e"]), TestStep::query("f")])
        .await?;

    assert_eq!(common::entries(&seen), vec!["SQL execution error: d failed"]);
    assert_eq!(driver.dispatched(), vec!["d", "e", "f"]);
    Ok(())
}

#[tokio::test]
async fn empty_queue_completes_without_io() -> Result<(), SqlTestError> {
    let driver = RecordingDriver::new();
    let mut compiler = open_compiler(&driver).await;

    let report = compiler
        .compile_test(Vec::<String>::new(), Vec::new())
        .await?;

    assert_eq!(report, CompileReport::default());
    assert!(driver.events().is_empty());
    Ok(())
}

#[tokio::test]
async fn long_queue_runs_without_recursion() -> Result<(), SqlTestError> {
    let driver = RecordingDriver::new();
    let mut compiler = open_compiler(&driver).await;
    let fired = Arc::new(AtomicUsize::new(0));

    let steps = (0..20_000).map(|i| {
        let fired = Arc::clone(&fired);
        let step = if i % 2 == 0 {
            TestStep::query(format!("q{i}"))
        } else {
            TestStep::skip()
        };
        step.with_assertion(move |_| {
            fired.fetch_add(1, Ordering::SeqCst);
        })
    });

    let report = compiler.compile(steps).await?;

    assert_eq!(report.dispatched, 10_000);
    assert_eq!(report.skipped, 10_000);
    assert_eq!(fired.load(Ordering::SeqCst), 10_000);
    Ok(())
}

#[tokio::test]
async fn arguments_reach_the_procedure() -> Result<(), SqlTestError> {
    let driver = RecordingDriver::new();
    let mut compiler = open_compiler(&driver).await;

    compiler
        .compile(vec![TestStep::stor_proc_with_args(
            "dbo.AddUser",
            ProcArgs::new().arg("name", "alice").maybe_arg::<i64>("age", None),
        )])
        .await?;

    assert_eq!(driver.input_count(), 1);
    assert_eq!(driver.dispatched(), vec!["dbo.AddUser"]);
    Ok(())
}

#[tokio::test]
async fn undispatchable_step_aborts_compile() {
    let driver = RecordingDriver::new();
    let mut compiler = open_compiler(&driver).await;
    let log = new_log();

    let err = compiler
        .compile(vec![
            TestStep::new(StepKind::StorProc {
                name: String::new(),
                args: ProcArgs::new(),
            })
            .with_assertion(recorder(&log, "blank")),
            TestStep::query("never").with_assertion(recorder(&log, "never")),
        ])
        .await
        .unwrap_err();

    assert!(matches!(err, SqlTestError::MissingArgument(_)));
    assert!(entries(&log).is_empty());
    assert_eq!(driver.request_count(), 0);
}

#[tokio::test]
async fn compile_without_connection_fails_before_io() {
    let driver = RecordingDriver::new();
    let mut compiler = common::compiler(&driver);

    let err = compiler
        .compile(vec![TestStep::query("SELECT 1")])
        .await
        .unwrap_err();

    assert!(matches!(err, SqlTestError::ConnectionError(_)));
    assert_eq!(driver.request_count(), 0);
}
