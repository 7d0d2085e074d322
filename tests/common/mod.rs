#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use easy_sql_test::test_utils::RecordingDriver;
use easy_sql_test::{AssertionCallback, Recordsets, RowValues, TestCompiler};

pub const DB_CONFIG: &str = "recording://testing";

pub type Log = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

pub fn compiler(driver: &RecordingDriver) -> TestCompiler<RecordingDriver> {
    TestCompiler::builder(driver.clone())
        .db_config(DB_CONFIG.to_string())
        .build()
        .expect("compiler with db_config")
}

pub async fn open_compiler(driver: &RecordingDriver) -> TestCompiler<RecordingDriver> {
    let mut compiler = compiler(driver);
    compiler.connection_open().await.expect("recording connect");
    driver.clear();
    compiler
}

/// The `target` column of the first row of the first result set.
pub fn target_of(sets: &Recordsets) -> String {
    sets.first()
        .and_then(|rs| rs.results.first())
        .and_then(|row| row.get("target"))
        .and_then(RowValues::as_text)
        .unwrap_or_default()
        .to_string()
}

/// An assertion that appends `label:ok:<target>` or `label:err:<error>`.
pub fn recorder(log: &Log, label: &'static str) -> AssertionCallback {
    let log = Arc::clone(log);
    Box::new(move |outcome| {
        let entry = match outcome {
            Ok(sets) => format!("{label}:ok:{}", target_of(&sets)),
            Err(err) => format!("{label}:err:{err}"),
        };
        log.lock().unwrap().push(entry);
    })
}
