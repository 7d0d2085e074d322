use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use crate::error::SqlTestError;
use crate::step::{StepSpec, TestStep};

/// A test run written down as JSON.
///
/// ```json
/// {
///   "prepQueries": ["DELETE FROM users"],
///   "steps": [
///     { "storProcName": "dbo.AddUser", "args": { "name": "alice" } },
///     { "query": "SELECT COUNT(*) AS n FROM users" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestPlan {
    #[serde(default)]
    pub prep_queries: Vec<Option<String>>,
    #[serde(default)]
    pub steps: Vec<StepSpec>,
}

impl TestPlan {
    /// # Errors
    /// Returns `SqlTestError::PlanError` if `json` is not a valid plan.
    pub fn from_json(json: &str) -> Result<Self, SqlTestError> {
        serde_json::from_str(json)
            .map_err(|e| SqlTestError::PlanError(format!("invalid test plan: {e}")))
    }

    /// # Errors
    /// Returns `SqlTestError::PlanError` if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SqlTestError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            SqlTestError::PlanError(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    /// Split into prep queries and steps. Every step logs its outcome.
    #[must_use]
    pub fn into_steps(self) -> (Vec<Option<String>>, Vec<TestStep>) {
        let steps = self
            .steps
            .into_iter()
            .enumerate()
            .map(|(idx, spec)| {
                let step = idx + 1;
                TestStep::from_spec(spec).with_assertion(move |outcome| match outcome {
                    Ok(sets) => {
                        let rows: usize = sets.iter().map(|rs| rs.len()).sum();
                        info!(step, result_sets = sets.len(), rows, "step passed");
                    }
                    Err(err) => error!(step, error = %err, "step failed"),
                })
            })
            .collect();

        (self.prep_queries, steps)
    }
}
