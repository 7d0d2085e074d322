use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use super::test_helpers::single_value_set;
use crate::driver::{Connection, Driver, Request};
use crate::error::SqlTestError;
use crate::results::Recordsets;
use crate::types::RowValues;

/// One call observed by the recording driver.
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Connect(String),
    Close,
    Request,
    Input { name: String, value: RowValues },
    Multiple(bool),
    Execute(String),
    Query(String),
}

#[derive(Debug, Default)]
struct State {
    events: Vec<Recorded>,
    failing: HashSet<String>,
    connect_error: Option<String>,
}

/// In-memory driver that records every call and answers each procedure or
/// query with a one-row set whose `target` column holds the procedure name
/// or query text.
///
/// Clones share the same log, so a test keeps one clone and hands the other
/// to the compiler.
#[derive(Debug, Clone, Default)]
pub struct RecordingDriver {
    state: Arc<Mutex<State>>,
}

impl RecordingDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the procedure or query `target` fail with an execution error.
    #[must_use]
    pub fn failing_on(self, target: impl Into<String>) -> Self {
        self.with_state(|state| {
            state.failing.insert(target.into());
        });
        self
    }

    /// Make every connect attempt fail.
    #[must_use]
    pub fn refusing_connections(self, message: impl Into<String>) -> Self {
        self.with_state(|state| state.connect_error = Some(message.into()));
        self
    }

    #[must_use]
    pub fn events(&self) -> Vec<Recorded> {
        self.with_state(|state| state.events.clone())
    }

    /// Procedure names and query texts in dispatch order.
    #[must_use]
    pub fn dispatched(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Recorded::Execute(target) | Recorded::Query(target) => Some(target),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn request_count(&self) -> usize {
        self.count(|event| matches!(event, Recorded::Request))
    }

    #[must_use]
    pub fn input_count(&self) -> usize {
        self.count(|event| matches!(event, Recorded::Input { .. }))
    }

    pub fn count(&self, predicate: impl Fn(&Recorded) -> bool) -> usize {
        self.with_state(|state| state.events.iter().filter(|e| predicate(*e)).count())
    }

    pub fn clear(&self) {
        self.with_state(|state| state.events.clear());
    }

    fn record(&self, event: Recorded) {
        self.with_state(|state| state.events.push(event));
    }

    fn is_failing(&self, target: &str) -> bool {
        self.with_state(|state| state.failing.contains(target))
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

#[async_trait]
impl Driver for RecordingDriver {
    type Config = String;
    type Connection = RecordingConnection;

    async fn connect(&self, config: &String) -> Result<RecordingConnection, SqlTestError> {
        self.record(Recorded::Connect(config.clone()));
        if let Some(message) = self.with_state(|state| state.connect_error.clone()) {
            return Err(SqlTestError::ConnectionError(message));
        }
        Ok(RecordingConnection {
            driver: self.clone(),
            open: true,
        })
    }
}

#[derive(Debug)]
pub struct RecordingConnection {
    driver: RecordingDriver,
    open: bool,
}

impl RecordingConnection {
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }
}

#[async_trait]
impl Connection for RecordingConnection {
    fn request(&mut self) -> Box<dyn Request + '_> {
        self.driver.record(Recorded::Request);
        Box::new(RecordingRequest {
            connection: self,
            multiple: false,
        })
    }

    async fn close(&mut self) -> Result<(), SqlTestError> {
        self.driver.record(Recorded::Close);
        self.open = false;
        Ok(())
    }
}

#[derive(Debug)]
pub struct RecordingRequest<'a> {
    connection: &'a RecordingConnection,
    multiple: bool,
}

impl<'a> RecordingRequest<'a> {
    fn answer(&self, event: Recorded, target: &str) -> Result<Recordsets, SqlTestError> {
        if !self.connection.open {
            return Err(SqlTestError::ConnectionError("connection is closed".to_string()));
        }

        let driver = &self.connection.driver;
        driver.record(event);
        if driver.is_failing(target) {
            return Err(SqlTestError::ExecutionError(format!("{target} failed")));
        }

        let mut sets = vec![single_value_set("target", RowValues::Text(target.to_string()))];
        if self.multiple {
            sets.push(single_value_set("multiple", RowValues::Bool(true)));
        }
        Ok(sets)
    }
}

#[async_trait]
impl<'a> Request for RecordingRequest<'a> {
    fn input(&mut self, name: &str, value: RowValues) {
        self.connection.driver.record(Recorded::Input {
            name: name.to_string(),
            value,
        });
    }

    fn set_multiple(&mut self, multiple: bool) {
        self.connection.driver.record(Recorded::Multiple(multiple));
        self.multiple = multiple;
    }

    async fn execute(&mut self, proc_name: &str) -> Result<Recordsets, SqlTestError> {
        self.answer(Recorded::Execute(proc_name.to_string()), proc_name)
    }

    async fn query(&mut self, text: &str) -> Result<Recordsets, SqlTestError> {
        self.answer(Recorded::Query(text.to_string()), text)
    }
}
