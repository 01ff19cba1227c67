//! Workflow evaluation: required-tool coverage plus an ordering bonus.

use crate::error::EvalError;
use crate::suite::definition::{Expectation, TestDefinition};

use super::{EvalInput, Verdict};

/// Scores a workflow test.
///
/// Points are distributed evenly across `required_tools`; tools may appear
/// in any order. An ordering bonus of at most 10% of `max_score` is awarded
/// when the first two required tools appear in declared order.
pub fn evaluate(
    definition: &TestDefinition,
    input: &EvalInput<'_>,
) -> Result<Verdict, EvalError> {
    let (expected_steps, required_tools, min_tool_calls) = match &definition.expected {
        Expectation::Workflow {
            expected_steps,
            required_tools,
            min_tool_calls,
        } => (*expected_steps, required_tools, *min_tool_calls),
        other => {
            return Err(EvalError::ExpectationMismatch {
                kind: other.kind().to_string(),
                reason: "workflow evaluator requires a workflow expectation".to_string(),
            })
        }
    };

    if required_tools.is_empty() {
        return Err(EvalError::ExpectationMismatch {
            kind: definition.kind().to_string(),
            reason: "workflow declares no required tools".to_string(),
        });
    }

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let found: Vec<&String> = required_tools
        .iter()
        .filter(|tool| input.observed.iter().any(|o| &o.tool_name == *tool))
        .collect();
    for tool in required_tools {
        if !found.contains(&tool) {
            errors.push(format!("Required tool '{}' was not invoked", tool));
        }
    }

    // Base score: even split over the required set.
    let mut score =
        definition.max_score * found.len() as u32 / required_tools.len() as u32;

    // Ordering bonus for the first two required tools.
    if required_tools.len() >= 2 && found.len() == required_tools.len() {
        if first_two_in_order(required_tools, input) {
            let bonus = (definition.max_score / 10).min(definition.bonus_score);
            score += bonus;
        } else {
            warnings.push("required tools out of order".to_string());
        }
    }

    if (input.observed.len() as u32) < min_tool_calls {
        warnings.push(format!(
            "Detected {} tool calls, below the declared minimum of {}",
            input.observed.len(),
            min_tool_calls
        ));
        score = score.saturating_sub(1);
    }

    if let Some(steps) = expected_steps {
        if input.observed.len() as u32 != steps {
            warnings.push(format!(
                "Detected {} steps, expected {}",
                input.observed.len(),
                steps
            ));
        }
    }

    let mut verdict = Verdict::scored(&definition.id, score, definition.max_score);
    verdict.errors.extend(errors);
    verdict.warnings.extend(warnings);
    Ok(verdict)
}

/// True when the first required tool is observed before the second.
fn first_two_in_order(required_tools: &[String], input: &EvalInput<'_>) -> bool {
    let first = input
        .observed
        .iter()
        .position(|o| o.tool_name == required_tools[0]);
    let second = input
        .observed
        .iter()
        .position(|o| o.tool_name == required_tools[1]);
    matches!((first, second), (Some(a), Some(b)) if a < b)
}
