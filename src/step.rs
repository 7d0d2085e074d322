use std::fmt;

use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};
use tracing::warn;

use crate::error::SqlTestError;
use crate::results::Recordsets;
use crate::types::RowValues;

/// Invoked once with the outcome of the step's procedure or query.
pub type AssertionCallback = Box<dyn FnOnce(Result<Recordsets, SqlTestError>) + Send>;

/// Query text that may be blank or absent.
///
/// Blank and absent texts are dropped when queries are turned into steps.
pub trait QueryText {
    fn into_query_text(self) -> Option<String>;
}

impl QueryText for String {
    fn into_query_text(self) -> Option<String> {
        (!self.is_empty()).then_some(self)
    }
}

impl QueryText for &str {
    fn into_query_text(self) -> Option<String> {
        (!self.is_empty()).then(|| self.to_string())
    }
}

impl QueryText for &String {
    fn into_query_text(self) -> Option<String> {
        self.as_str().into_query_text()
    }
}

impl<T: QueryText> QueryText for Option<T> {
    fn into_query_text(self) -> Option<String> {
        self.and_then(QueryText::into_query_text)
    }
}

/// Named stored procedure inputs, kept in insertion order.
///
/// A `None` value is an absent argument and is never bound, which lets a
/// caller reuse one sparse map across calls. `Some(RowValues::Null)` binds
/// SQL `NULL`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "Map<String, JsonValue>")]
pub struct ProcArgs {
    entries: Vec<(String, Option<RowValues>)>,
}

impl ProcArgs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<RowValues>) -> Self {
        self.insert(name, Some(value.into()));
        self
    }

    #[must_use]
    pub fn maybe_arg<V: Into<RowValues>>(
        mut self,
        name: impl Into<String>,
        value: Option<V>,
    ) -> Self {
        self.insert(name, value.map(Into::into));
        self
    }

    /// Set an argument, replacing an earlier value of the same name in place.
    pub fn insert(&mut self, name: impl Into<String>, value: Option<RowValues>) {
        let name = name.into();
        if let Some(slot) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    /// Only the entries that will be bound.
    pub fn present(&self) -> impl Iterator<Item = (&str, &RowValues)> {
        self.entries
            .iter()
            .filter_map(|(n, v)| v.as_ref().map(|v| (n.as_str(), v)))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>> FromIterator<(N, Option<RowValues>)> for ProcArgs {
    fn from_iter<I: IntoIterator<Item = (N, Option<RowValues>)>>(iter: I) -> Self {
        let mut args = ProcArgs::new();
        for (name, value) in iter {
            args.insert(name, value);
        }
        args
    }
}

impl From<Map<String, JsonValue>> for ProcArgs {
    fn from(map: Map<String, JsonValue>) -> Self {
        map.into_iter()
            .map(|(name, value)| (name, Some(RowValues::from_json(value))))
            .collect()
    }
}

/// What a step does, decided once when the step is built.
#[derive(Debug, Clone, PartialEq)]
pub enum StepKind {
    /// Call a stored procedure with the present arguments bound.
    StorProc { name: String, args: ProcArgs },
    /// Run literal SQL text.
    Query { text: String },
    /// A group of queries spliced into the queue where the step stood.
    Queries(Vec<String>),
    /// Nothing to run.
    Skip,
}

impl StepKind {
    /// Resolve loosely shaped step fields.
    ///
    /// A non-empty `queries` group wins over everything else, then a
    /// procedure name, then query text. With none of them the step is
    /// [`StepKind::Skip`]. A group holding only blank texts still wins and
    /// gives a skipped step.
    #[must_use]
    pub fn from_parts(
        stor_proc_name: Option<String>,
        query: Option<String>,
        queries: Option<Vec<Option<String>>>,
        args: ProcArgs,
    ) -> Self {
        if let Some(queries) = queries.filter(|q| !q.is_empty()) {
            return StepKind::group(queries);
        }

        let name = stor_proc_name.into_query_text();
        let text = query.into_query_text();
        match (name, text) {
            (Some(name), Some(text)) => {
                warn!(
                    procedure = %name,
                    query = %text,
                    "step names both a stored procedure and a query; the query is ignored"
                );
                StepKind::StorProc { name, args }
            }
            (Some(name), None) => StepKind::StorProc { name, args },
            (None, Some(text)) => StepKind::Query { text },
            (None, None) => StepKind::Skip,
        }
    }

    /// A `queries` group of the non-blank texts, or `Skip` if none remain.
    fn group<I>(texts: I) -> Self
    where
        I: IntoIterator,
        I::Item: QueryText,
    {
        let texts: Vec<String> = texts
            .into_iter()
            .filter_map(QueryText::into_query_text)
            .collect();
        if texts.is_empty() {
            StepKind::Skip
        } else {
            StepKind::Queries(texts)
        }
    }
}

/// One unit of sequential work plus its optional assertion.
pub struct TestStep {
    kind: StepKind,
    assertion: Option<AssertionCallback>,
}

impl TestStep {
    #[must_use]
    pub fn new(kind: StepKind) -> Self {
        Self {
            kind,
            assertion: None,
        }
    }

    /// A stored procedure call with no arguments. An empty name gives a skipped step.
    #[must_use]
    pub fn stor_proc(name: impl Into<String>) -> Self {
        Self::stor_proc_with_args(name, ProcArgs::new())
    }

    #[must_use]
    pub fn stor_proc_with_args(name: impl Into<String>, args: ProcArgs) -> Self {
        Self::new(StepKind::from_parts(Some(name.into()), None, None, args))
    }

    /// A raw query. Empty text gives a skipped step.
    #[must_use]
    pub fn query(text: impl Into<String>) -> Self {
        Self::new(StepKind::from_parts(None, Some(text.into()), None, ProcArgs::new()))
    }

    /// A group of queries expanded in place when the step is reached.
    /// Without any non-blank text the step is skipped.
    #[must_use]
    pub fn queries<I>(texts: I) -> Self
    where
        I: IntoIterator,
        I::Item: QueryText,
    {
        Self::new(StepKind::group(texts))
    }

    #[must_use]
    pub fn skip() -> Self {
        Self::new(StepKind::Skip)
    }

    /// Resolve a loosely shaped spec into a step without an assertion.
    #[must_use]
    pub fn from_spec(spec: StepSpec) -> Self {
        Self::new(spec.into_kind())
    }

    /// Attach the callback that receives this step's outcome.
    ///
    /// Assertions on `queries` groups and skipped steps are never invoked.
    #[must_use]
    pub fn with_assertion<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(Result<Recordsets, SqlTestError>) + Send + 'static,
    {
        self.assertion = Some(Box::new(assertion));
        self
    }

    #[must_use]
    pub fn kind(&self) -> &StepKind {
        &self.kind
    }

    #[must_use]
    pub fn has_assertion(&self) -> bool {
        self.assertion.is_some()
    }

    pub(crate) fn into_parts(self) -> (StepKind, Option<AssertionCallback>) {
        (self.kind, self.assertion)
    }
}

impl fmt::Debug for TestStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestStep")
            .field("kind", &self.kind)
            .field("assertion", &self.assertion.is_some())
            .finish()
    }
}

impl From<StepKind> for TestStep {
    fn from(kind: StepKind) -> Self {
        TestStep::new(kind)
    }
}

/// Step fields as written in a test plan file.
///
/// ```json
/// { "storProcName": "dbo.AddUser", "args": { "name": "a", "age": 2 } }
/// { "query": "SELECT 1" }
/// { "queries": ["DELETE FROM t", "INSERT INTO t VALUES (1)"] }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepSpec {
    #[serde(default)]
    pub stor_proc_name: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub queries: Option<Vec<Option<String>>>,
    #[serde(default)]
    pub args: ProcArgs,
}

impl StepSpec {
    #[must_use]
    pub fn into_kind(self) -> StepKind {
        StepKind::from_parts(self.stor_proc_name, self.query, self.queries, self.args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::CapturedLogs;

    #[test]
    fn absent_args_are_not_present() {
        let args = ProcArgs::new()
            .arg("a", "a")
            .arg("b", "b")
            .maybe_arg::<RowValues>("c", None)
            .arg("d", 2);

        assert_eq!(args.len(), 4);
        let bound: Vec<&str> = args.present().map(|(n, _)| n).collect();
        assert_eq!(bound, vec!["a", "b", "d"]);
    }

    #[test]
    fn null_arg_is_still_bound() {
        let args = ProcArgs::new().arg("n", RowValues::Null);
        assert_eq!(args.present().count(), 1);
    }

    #[test]
    fn reinserting_keeps_position() {
        let mut args = ProcArgs::new().arg("x", 1).arg("y", 2);
        args.insert("x", Some(RowValues::Int(9)));
        let entries: Vec<_> = args.present().collect();
        assert_eq!(entries[0], ("x", &RowValues::Int(9)));
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn queries_take_priority() {
        let kind = StepKind::from_parts(
            Some("proc".into()),
            Some("SELECT 1".into()),
            Some(vec![Some("d".into()), None, Some(String::new()), Some("e".into())]),
            ProcArgs::new(),
        );
        assert_eq!(kind, StepKind::Queries(vec!["d".into(), "e".into()]));
    }

    #[test]
    fn stored_procedure_wins_over_query() {
        let (logs, _guard) = CapturedLogs::install();
        let kind = StepKind::from_parts(
            Some("proc".into()),
            Some("SELECT 1".into()),
            None,
            ProcArgs::new(),
        );

        assert!(matches!(kind, StepKind::StorProc { ref name, .. } if name == "proc"));
        assert!(logs.contains("WARN"));
        assert!(logs.contains("the query is ignored"));
    }

    #[test]
    fn blank_group_is_skipped() {
        assert_eq!(TestStep::queries(["", ""]).kind(), &StepKind::Skip);
        assert_eq!(TestStep::queries(Vec::<String>::new()).kind(), &StepKind::Skip);
        assert_eq!(
            StepKind::from_parts(
                Some("proc".into()),
                None,
                Some(vec![None, Some(String::new())]),
                ProcArgs::new(),
            ),
            StepKind::Skip
        );
    }

    #[test]
    fn empty_fields_skip() {
        assert_eq!(
            StepKind::from_parts(Some(String::new()), None, Some(vec![]), ProcArgs::new()),
            StepKind::Skip
        );
        assert_eq!(TestStep::query("").kind(), &StepKind::Skip);
        assert_eq!(TestStep::stor_proc("").kind(), &StepKind::Skip);
    }

    #[test]
    fn step_spec_reads_camel_case_json() {
        let spec: StepSpec = serde_json::from_str(
            r#"{ "storProcName": "dbo.AddUser", "args": { "name": "a", "age": 2 } }"#,
        )
        .unwrap();
        match spec.into_kind() {
            StepKind::StorProc { name, args } => {
                assert_eq!(name, "dbo.AddUser");
                assert_eq!(args.present().count(), 2);
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }
}
