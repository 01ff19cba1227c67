//! Parameter matching rules for function-call evaluation.
//!
//! Calibrated tolerances: exact equality, case-insensitive strings, numeric
//! closeness (10% of expected or 1, whichever is greater), tagged
//! placeholders, and position-to-range conversion in both directions with a
//! half-range tolerance.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::suite::definition::ExpectedValue;

/// Result of matching all declared parameters of one expected call.
#[derive(Debug, Clone, Default)]
pub struct ParamReport {
    /// Number of declared parameters.
    pub total: usize,
    /// Number that matched.
    pub matched: usize,
    /// One message per failed parameter.
    pub failures: Vec<String>,
}

impl ParamReport {
    /// Declared parameters that did not match.
    pub fn missed(&self) -> u32 {
        (self.total - self.matched) as u32
    }
}

/// Matches every declared parameter against the observation.
///
/// Handles the position/range conversion jointly before falling back to
/// per-key rules: an expected `position` is satisfied by an observed
/// `start`/`end` range containing it, and an expected `start`/`end` pair is
/// satisfied by an observed `position` inside it, each widened by half the
/// range.
pub fn match_parameters(
    expected: &BTreeMap<String, ExpectedValue>,
    observed: &Map<String, Value>,
) -> ParamReport {
    let mut report = ParamReport {
        total: expected.len(),
        ..ParamReport::default()
    };

    let mut handled: Vec<&str> = Vec::new();

    // Expected position, observed start/end range.
    if let Some(position) = expected_number(expected, "position") {
        if !observed.contains_key("position") {
            if let (Some(start), Some(end)) =
                (observed_number(observed, "start"), observed_number(observed, "end"))
            {
                handled.push("position");
                if position_in_range(position, start, end) {
                    report.matched += 1;
                } else {
                    report.failures.push(format!(
                        "parameter 'position': {} outside observed range [{}, {}]",
                        position, start, end
                    ));
                }
            }
        }
    }

    // Expected start/end range, observed position.
    if let (Some(start), Some(end)) =
        (expected_number(expected, "start"), expected_number(expected, "end"))
    {
        if !observed.contains_key("start")
            && !observed.contains_key("end")
            && observed.contains_key("position")
        {
            if let Some(position) = observed_number(observed, "position") {
                handled.push("start");
                handled.push("end");
                if position_in_range(position, start, end) {
                    report.matched += 2;
                } else {
                    report.failures.push(format!(
                        "parameters 'start'/'end': observed position {} outside expected range [{}, {}]",
                        position, start, end
                    ));
                }
            }
        }
    }

    for (key, expected_value) in expected {
        if handled.contains(&key.as_str()) {
            continue;
        }
        match observed.get(key) {
            None => report
                .failures
                .push(format!("parameter '{}': missing from observation", key)),
            Some(observed_value) => {
                if value_matches(expected_value, observed_value) {
                    report.matched += 1;
                } else {
                    report.failures.push(format!(
                        "parameter '{}': expected {}, got {}",
                        key,
                        render(expected_value),
                        observed_value
                    ));
                }
            }
        }
    }

    report
}

/// Single-value matching rules.
pub fn value_matches(expected: &ExpectedValue, observed: &Value) -> bool {
    match expected {
        ExpectedValue::Placeholder(_) => placeholder_matches(observed),
        ExpectedValue::Value(expected) => {
            if expected == observed {
                return true;
            }
            // Case-insensitive string equality.
            if let (Value::String(e), Value::String(o)) = (expected, observed) {
                if e.eq_ignore_ascii_case(o) {
                    return true;
                }
            }
            // Numeric tolerance: 10% of expected or 1, whichever is greater.
            if let (Some(e), Some(o)) = (expected.as_f64(), observed.as_f64()) {
                let tolerance = (e.abs() * 0.1).max(1.0);
                return (e - o).abs() <= tolerance;
            }
            false
        }
    }
}

/// A placeholder matches any non-empty concrete value of the right kind.
fn placeholder_matches(observed: &Value) -> bool {
    match observed {
        Value::String(s) => !s.trim().is_empty(),
        Value::Null => false,
        _ => true,
    }
}

/// `position` lies within `[start, end]` widened by half the range.
fn position_in_range(position: f64, start: f64, end: f64) -> bool {
    let (low, high) = if start <= end { (start, end) } else { (end, start) };
    let tolerance = (high - low) / 2.0;
    position >= low - tolerance && position <= high + tolerance
}

fn expected_number(expected: &BTreeMap<String, ExpectedValue>, key: &str) -> Option<f64> {
    match expected.get(key)? {
        ExpectedValue::Value(v) => v.as_f64(),
        ExpectedValue::Placeholder(_) => None,
    }
}

fn observed_number(observed: &Map<String, Value>, key: &str) -> Option<f64> {
    observed.get(key)?.as_f64()
}

fn render(value: &ExpectedValue) -> String {
    match value {
        ExpectedValue::Value(v) => v.to_string(),
        ExpectedValue::Placeholder(name) => format!("<{}>", name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn observed(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn expected(pairs: Vec<(&str, ExpectedValue)>) -> BTreeMap<String, ExpectedValue> {
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[test]
    fn test_exact_and_case_insensitive_strings() {
        assert!(value_matches(&ExpectedValue::string("lacZ"), &json!("lacZ")));
        assert!(value_matches(&ExpectedValue::string("lacZ"), &json!("LACZ")));
        assert!(!value_matches(&ExpectedValue::string("lacZ"), &json!("araA")));
    }

    #[test]
    fn test_numeric_tolerance() {
        // 10% of 100000 = 10000.
        assert!(value_matches(&ExpectedValue::int(100_000), &json!(109_000)));
        assert!(!value_matches(&ExpectedValue::int(100_000), &json!(111_000)));
        // Floor of 1 for small values.
        assert!(value_matches(&ExpectedValue::int(3), &json!(4)));
        assert!(!value_matches(&ExpectedValue::int(3), &json!(5)));
    }

    #[test]
    fn test_placeholder_matches_non_empty() {
        let placeholder = ExpectedValue::Placeholder("current_chromosome".to_string());
        assert!(value_matches(&placeholder, &json!("COLI-K12")));
        assert!(value_matches(&placeholder, &json!(7)));
        assert!(!value_matches(&placeholder, &json!("")));
        assert!(!value_matches(&placeholder, &json!(null)));
    }

    #[test]
    fn test_position_to_observed_range() {
        let exp = expected(vec![
            ("chromosome", ExpectedValue::Placeholder("current_chromosome".to_string())),
            ("position", ExpectedValue::int(100_000)),
        ]);
        let obs = observed(&[
            ("chromosome", json!("COLI-K12")),
            ("start", json!(99_000)),
            ("end", json!(101_000)),
        ]);
        let report = match_parameters(&exp, &obs);
        assert_eq!(report.matched, 2);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn test_position_outside_widened_range() {
        let exp = expected(vec![("position", ExpectedValue::int(200_000))]);
        let obs = observed(&[("start", json!(99_000)), ("end", json!(101_000))]);
        let report = match_parameters(&exp, &obs);
        assert_eq!(report.matched, 0);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].contains("outside observed range"));
    }

    #[test]
    fn test_range_expectation_matches_observed_position() {
        let exp = expected(vec![
            ("start", ExpectedValue::int(99_000)),
            ("end", ExpectedValue::int(101_000)),
        ]);
        let obs = observed(&[("position", json!(100_500))]);
        let report = match_parameters(&exp, &obs);
        assert_eq!(report.total, 2);
        assert_eq!(report.matched, 2);
    }

    #[test]
    fn test_missing_parameter_reported() {
        let exp = expected(vec![("name", ExpectedValue::string("lacZ"))]);
        let report = match_parameters(&exp, &observed(&[]));
        assert_eq!(report.missed(), 1);
        assert!(report.failures[0].contains("missing from observation"));
    }

    #[test]
    fn test_extra_observed_parameters_never_hurt() {
        let exp = expected(vec![("name", ExpectedValue::string("lacZ"))]);
        let base = match_parameters(&exp, &observed(&[("name", json!("lacZ"))]));
        let extra = match_parameters(
            &exp,
            &observed(&[("name", json!("lacZ")), ("verbose", json!(true))]),
        );
        assert_eq!(base.matched, extra.matched);
    }
}
