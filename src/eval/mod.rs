//! Verdicts and evaluator dispatch.
//!
//! The evaluator takes a test definition plus the observations recovered for
//! one run of that test and produces a [`Verdict`]. Dispatch follows the
//! expectation kind, with an optional per-test override resolved against a
//! registry of custom evaluators.

pub mod content;
pub mod function_call;
pub mod matcher;
pub mod workflow;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::agent::ToolCallRecord;
use crate::error::EvalError;
use crate::extract::ObservedCall;
use crate::metrics::TestMetrics;
use crate::suite::definition::{Category, TestDefinition, TestKind};

/// Minimum confidence at which an inferred (non-tracker) observation is
/// accepted at all.
pub const MIN_ACCEPT_CONFIDENCE: u8 = 50;

/// Below this confidence an accepted observation earns a warning.
pub const LOW_CONFIDENCE_WARNING: u8 = 70;

/// Tracker records younger than this at window end override textual evidence.
pub const TRACKER_OVERRIDE_SECS: i64 = 30;

/// Outcome status for one test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Passed,
    Failed,
    Error,
    Cancelled,
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
            TestStatus::Error => "error",
            TestStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", name)
    }
}

/// The outcome of evaluating one test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    /// Test this verdict belongs to.
    pub test_id: String,
    /// Category tag carried over from the definition for breakdowns.
    pub category: Category,
    /// Outcome status.
    pub status: TestStatus,
    /// Points awarded, never above `max_score`.
    pub score: u32,
    /// Declared maximum from the test definition.
    pub max_score: u32,
    /// Structured explanations for each deduction or failure.
    pub errors: Vec<String>,
    /// Non-fatal diagnostics.
    pub warnings: Vec<String>,
    /// Measurements collected by the runner.
    pub metrics: TestMetrics,
    /// Observations the evaluation was based on, retained for replay.
    pub observed: Vec<ObservedCall>,
    /// Tracker window consulted at evaluation time, retained for replay.
    pub tracker_window: Vec<ToolCallRecord>,
}

impl Verdict {
    /// Creates a scored verdict; status derives from the pass threshold and
    /// the score is clamped to `max_score`.
    pub fn scored(test_id: impl Into<String>, score: u32, max_score: u32) -> Self {
        let score = score.min(max_score);
        let status = if score >= pass_threshold(max_score) {
            TestStatus::Passed
        } else {
            TestStatus::Failed
        };
        Self {
            test_id: test_id.into(),
            category: Category::General,
            status,
            score,
            max_score,
            errors: Vec::new(),
            warnings: Vec::new(),
            metrics: TestMetrics::default(),
            observed: Vec::new(),
            tracker_window: Vec::new(),
        }
    }

    /// Creates a zero-score failure with one error message.
    pub fn failed(test_id: impl Into<String>, max_score: u32, error: impl Into<String>) -> Self {
        let mut verdict = Self::scored(test_id, 0, max_score);
        verdict.status = TestStatus::Failed;
        verdict.errors.push(error.into());
        verdict
    }

    /// Creates an `error` verdict with one error message.
    pub fn error(test_id: impl Into<String>, max_score: u32, error: impl Into<String>) -> Self {
        let mut verdict = Self::scored(test_id, 0, max_score);
        verdict.status = TestStatus::Error;
        verdict.errors.push(error.into());
        verdict
    }

    /// Creates a `cancelled` verdict with zero score.
    pub fn cancelled(test_id: impl Into<String>, max_score: u32) -> Self {
        let mut verdict = Self::scored(test_id, 0, max_score);
        verdict.status = TestStatus::Cancelled;
        verdict
    }

    /// Attaches an error message.
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.errors.push(error.into());
        self
    }

    /// Attaches a warning.
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }
}

/// Pass threshold: `ceil(0.6 * max_score)`.
pub fn pass_threshold(max_score: u32) -> u32 {
    (3 * max_score).div_ceil(5)
}

/// Everything the evaluator may consult for one test run.
#[derive(Debug, Clone, Copy)]
pub struct EvalInput<'a> {
    /// Final agent response text.
    pub response: &'a str,
    /// Extractor output, in observation order.
    pub observed: &'a [ObservedCall],
    /// Tracker records whose start time fell inside the test window.
    pub tracker_window: &'a [ToolCallRecord],
    /// End of the test's execution window.
    pub window_end: DateTime<Utc>,
}

/// A pluggable evaluator, selected by `TestDefinition::evaluator_id`.
pub trait TestEvaluator: Send + Sync {
    /// Produces a verdict for one test.
    fn evaluate(&self, definition: &TestDefinition, input: &EvalInput<'_>)
        -> Result<Verdict, EvalError>;
}

/// Dispatching evaluator: kind-based defaults plus registered overrides.
#[derive(Default)]
pub struct Evaluator {
    custom: HashMap<String, Arc<dyn TestEvaluator>>,
}

impl Evaluator {
    /// Creates an evaluator with only the built-in kind dispatch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a custom evaluator under an id.
    pub fn register(&mut self, id: impl Into<String>, evaluator: Arc<dyn TestEvaluator>) {
        self.custom.insert(id.into(), evaluator);
    }

    /// Scores one test. Retains the observations and tracker window on the
    /// verdict so failures can be replayed offline.
    pub fn evaluate(
        &self,
        definition: &TestDefinition,
        input: &EvalInput<'_>,
    ) -> Result<Verdict, EvalError> {
        let mut verdict = match &definition.evaluator_id {
            Some(id) => {
                let custom = self
                    .custom
                    .get(id)
                    .ok_or_else(|| EvalError::UnknownEvaluator(id.clone()))?;
                custom.evaluate(definition, input)?
            }
            None => match definition.kind() {
                TestKind::FunctionCall => function_call::evaluate(definition, input)?,
                TestKind::Workflow => workflow::evaluate(definition, input)?,
                TestKind::TextAnalysis => content::evaluate_text(definition, input)?,
                TestKind::JsonOutput => content::evaluate_json(definition, input)?,
                TestKind::Generic => content::evaluate_generic(definition, input)?,
            },
        };

        // max_score always comes from the definition, score never exceeds it.
        verdict.max_score = definition.max_score;
        verdict.score = verdict.score.min(verdict.max_score);
        verdict.category = definition.category;
        verdict.observed = input.observed.to_vec();
        verdict.tracker_window = input.tracker_window.to_vec();

        debug!(
            test_id = %definition.id,
            status = %verdict.status,
            score = verdict.score,
            max_score = verdict.max_score,
            "Evaluated test"
        );
        Ok(verdict)
    }
}
