//! Function-call evaluation, the scoring workhorse.
//!
//! Name match gates the full score baseline; each declared parameter then
//! deducts one point on failure. Tracker evidence from the last 30 seconds
//! of the test window overrides textual evidence in both directions.

use chrono::Duration;
use regex::Regex;

use crate::error::EvalError;
use crate::extract::{Evidence, ObservedCall};
use crate::suite::definition::{ExpectedCall, Expectation, TestDefinition};

use super::matcher::match_parameters;
use super::{
    EvalInput, Verdict, LOW_CONFIDENCE_WARNING, MIN_ACCEPT_CONFIDENCE, TRACKER_OVERRIDE_SECS,
};

/// Scores a function_call test.
pub fn evaluate(
    definition: &TestDefinition,
    input: &EvalInput<'_>,
) -> Result<Verdict, EvalError> {
    let calls = match &definition.expected {
        Expectation::FunctionCall { calls } => calls,
        other => {
            return Err(EvalError::ExpectationMismatch {
                kind: other.kind().to_string(),
                reason: "function_call evaluator requires a function_call expectation".to_string(),
            })
        }
    };

    match calls.as_slice() {
        [] => Err(EvalError::ExpectationMismatch {
            kind: definition.kind().to_string(),
            reason: "no expected calls declared".to_string(),
        }),
        [single] => Ok(evaluate_single(definition, single, input)),
        many => Ok(evaluate_sequence(definition, many, input)),
    }
}

fn evaluate_single(
    definition: &TestDefinition,
    expected: &ExpectedCall,
    input: &EvalInput<'_>,
) -> Verdict {
    // Tracker override: a fresh record of the expected tool decides the
    // verdict outright.
    if let Some(record) = latest_override_record(expected, input) {
        return match record.status {
            crate::agent::ToolCallStatus::Completed => {
                Verdict::scored(&definition.id, definition.max_score, definition.max_score)
            }
            crate::agent::ToolCallStatus::Failed => Verdict::failed(
                &definition.id,
                definition.max_score,
                format!(
                    "Tracker reports failed invocation of '{}': {}",
                    expected.tool_name,
                    record.error.as_deref().unwrap_or("unknown error")
                ),
            ),
            crate::agent::ToolCallStatus::Running => {
                score_from_observations(definition, expected, input)
            }
        };
    }

    // Explicit completion phrasing is equivalent to a successful record.
    if completion_phrase_present(input.response, &expected.tool_name) {
        return Verdict::scored(&definition.id, definition.max_score, definition.max_score);
    }

    score_from_observations(definition, expected, input)
}

fn score_from_observations(
    definition: &TestDefinition,
    expected: &ExpectedCall,
    input: &EvalInput<'_>,
) -> Verdict {
    let candidate = resolve_candidate(&expected.tool_name, input.observed);
    let candidate = match candidate {
        Some(c) => c,
        None => {
            return Verdict::failed(
                &definition.id,
                definition.max_score,
                format!(
                    "Expected tool '{}' but no tool invocation was detected",
                    expected.tool_name
                ),
            )
        }
    };

    // Name match gates the entire score.
    if candidate.tool_name != expected.tool_name {
        return Verdict::failed(
            &definition.id,
            definition.max_score,
            format!(
                "Expected tool '{}' but got '{}'",
                expected.tool_name, candidate.tool_name
            ),
        );
    }

    // Inferred observations below the acceptance threshold are refused.
    if candidate.evidence != Evidence::Tracker && candidate.confidence < MIN_ACCEPT_CONFIDENCE {
        return Verdict::failed(
            &definition.id,
            definition.max_score,
            format!(
                "Observation of '{}' at confidence {} is below the acceptance threshold",
                candidate.tool_name, candidate.confidence
            ),
        );
    }

    let report = match_parameters(&expected.parameters, &candidate.parameters);
    let score = definition.max_score.saturating_sub(report.missed());
    let mut verdict = Verdict::scored(&definition.id, score, definition.max_score);
    verdict.errors.extend(report.failures);

    if candidate.evidence != Evidence::Tracker && candidate.confidence < LOW_CONFIDENCE_WARNING {
        verdict.warnings.push(format!(
            "Observation of '{}' inferred at low confidence {}",
            candidate.tool_name, candidate.confidence
        ));
    }

    verdict
}

/// Ordered multi-call expectation: expected calls must appear as a
/// subsequence of the observed invocations. Score is split evenly across
/// calls, each deducting one point per failed parameter.
fn evaluate_sequence(
    definition: &TestDefinition,
    calls: &[ExpectedCall],
    input: &EvalInput<'_>,
) -> Verdict {
    let share = definition.max_score / calls.len() as u32;
    let remainder = definition.max_score % calls.len() as u32;

    let mut score = 0u32;
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut cursor = 0usize;

    for (index, expected) in calls.iter().enumerate() {
        let call_share = if index == 0 { share + remainder } else { share };

        let in_order = input.observed[cursor..]
            .iter()
            .position(|o| o.tool_name == expected.tool_name)
            .map(|offset| cursor + offset);
        let anywhere = input
            .observed
            .iter()
            .position(|o| o.tool_name == expected.tool_name);

        let observed_index = match (in_order, anywhere) {
            (Some(i), _) => {
                cursor = i + 1;
                Some(i)
            }
            (None, Some(i)) => {
                warnings.push(format!(
                    "Expected call '{}' appears out of declared order",
                    expected.tool_name
                ));
                Some(i)
            }
            (None, None) => {
                errors.push(format!(
                    "Expected tool '{}' was not invoked",
                    expected.tool_name
                ));
                None
            }
        };

        if let Some(i) = observed_index {
            let report = match_parameters(&expected.parameters, &input.observed[i].parameters);
            score += call_share.saturating_sub(report.missed());
            errors.extend(report.failures);
        }
    }

    let mut verdict = Verdict::scored(&definition.id, score, definition.max_score);
    verdict.errors.extend(errors);
    verdict.warnings.extend(warnings);
    verdict
}

/// Picks the observation matching the expected name, falling back to the
/// highest-confidence observation.
fn resolve_candidate<'a>(
    expected_name: &str,
    observed: &'a [ObservedCall],
) -> Option<&'a ObservedCall> {
    observed
        .iter()
        .find(|o| o.tool_name == expected_name)
        .or_else(|| observed.iter().max_by_key(|o| o.confidence))
}

/// Most recent tracker record of the expected tool inside the override
/// window (the last 30 seconds before window end).
fn latest_override_record<'a>(
    expected: &ExpectedCall,
    input: &'a EvalInput<'_>,
) -> Option<&'a crate::agent::ToolCallRecord> {
    let cutoff = input.window_end - Duration::seconds(TRACKER_OVERRIDE_SECS);
    input
        .tracker_window
        .iter()
        .filter(|r| r.tool_name == expected.tool_name && r.started_at >= cutoff)
        .max_by_key(|r| r.started_at)
}

/// Literal "tool execution completed: <tool> succeeded" check against the
/// raw response.
fn completion_phrase_present(response: &str, tool_name: &str) -> bool {
    let pattern = format!(
        r#"(?i)tool\s+execution\s+completed:?\s*["'`]?{}["'`]?\s*succeeded"#,
        regex::escape(tool_name)
    );
    Regex::new(&pattern)
        .map(|re| re.is_match(response))
        .unwrap_or(false)
}
