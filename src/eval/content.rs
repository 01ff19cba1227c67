//! Content evaluators: text analysis, JSON output, and generic equality.

use crate::error::EvalError;
use crate::extract::balanced_json_fragment;
use crate::suite::definition::{Expectation, TestDefinition};

use super::{EvalInput, Verdict};

/// Scores a text_analysis test: word count, keyword coverage, and optional
/// structural indicators (lists, headings, paragraph breaks).
pub fn evaluate_text(
    definition: &TestDefinition,
    input: &EvalInput<'_>,
) -> Result<Verdict, EvalError> {
    let (min_words, required_keywords, require_structure) = match &definition.expected {
        Expectation::TextAnalysis {
            min_words,
            required_keywords,
            require_structure,
        } => (*min_words, required_keywords, *require_structure),
        other => {
            return Err(EvalError::ExpectationMismatch {
                kind: other.kind().to_string(),
                reason: "text evaluator requires a text_analysis expectation".to_string(),
            })
        }
    };

    let mut errors = Vec::new();
    let checks = 1 + required_keywords.len() + usize::from(require_structure);
    let mut passed = 0usize;

    let word_count = input.response.split_whitespace().count();
    if word_count >= min_words {
        passed += 1;
    } else {
        errors.push(format!(
            "Response has {} words, below the required {}",
            word_count, min_words
        ));
    }

    let lowered = input.response.to_lowercase();
    for keyword in required_keywords {
        if lowered.contains(&keyword.to_lowercase()) {
            passed += 1;
        } else {
            errors.push(format!("Missing required keyword '{}'", keyword));
        }
    }

    if require_structure {
        if has_structure(input.response) {
            passed += 1;
        } else {
            errors.push("Response lacks structure (lists, headings, or paragraphs)".to_string());
        }
    }

    let score = (definition.max_score as usize * passed / checks) as u32;
    let mut verdict = Verdict::scored(&definition.id, score, definition.max_score);
    verdict.errors.extend(errors);
    Ok(verdict)
}

/// Scores a json_output test: the first balanced JSON object in the
/// response must carry the required fields with agreeing primitive types.
pub fn evaluate_json(
    definition: &TestDefinition,
    input: &EvalInput<'_>,
) -> Result<Verdict, EvalError> {
    let (required_fields, field_types) = match &definition.expected {
        Expectation::JsonOutput {
            required_fields,
            field_types,
        } => (required_fields, field_types),
        other => {
            return Err(EvalError::ExpectationMismatch {
                kind: other.kind().to_string(),
                reason: "json evaluator requires a json_output expectation".to_string(),
            })
        }
    };

    let object = match first_json_object(input.response) {
        Some(object) => object,
        None => {
            return Ok(Verdict::failed(
                &definition.id,
                definition.max_score,
                "No JSON object found in response",
            ))
        }
    };

    let mut errors = Vec::new();
    let mut passed = 0usize;
    let checks = required_fields.len();

    for field in required_fields {
        match object.get(field) {
            None => errors.push(format!("Missing required field '{}'", field)),
            Some(value) => match field_types.get(field) {
                Some(tag) if !tag.matches(value) => errors.push(format!(
                    "Field '{}' has the wrong type (expected {:?})",
                    field, tag
                )),
                _ => passed += 1,
            },
        }
    }

    let score = (definition.max_score as usize * passed / checks.max(1)) as u32;
    let mut verdict = Verdict::scored(&definition.id, score, definition.max_score);
    verdict.errors.extend(errors);
    Ok(verdict)
}

/// Scores a generic test: equality against a single declared value.
pub fn evaluate_generic(
    definition: &TestDefinition,
    input: &EvalInput<'_>,
) -> Result<Verdict, EvalError> {
    let expected = match &definition.expected {
        Expectation::Generic { value } => value,
        other => {
            return Err(EvalError::ExpectationMismatch {
                kind: other.kind().to_string(),
                reason: "generic evaluator requires a generic expectation".to_string(),
            })
        }
    };

    let trimmed = input.response.trim();
    let matched = match expected {
        serde_json::Value::String(s) => trimmed == s,
        other => serde_json::from_str::<serde_json::Value>(trimmed)
            .map(|parsed| &parsed == other)
            .unwrap_or(false),
    };

    if matched {
        Ok(Verdict::scored(
            &definition.id,
            definition.max_score,
            definition.max_score,
        ))
    } else {
        Ok(Verdict::failed(
            &definition.id,
            definition.max_score,
            format!("Expected {}, got '{}'", expected, truncate(trimmed, 120)),
        ))
    }
}

/// Finds the first balanced JSON object anywhere in `text`.
fn first_json_object(text: &str) -> Option<serde_json::Map<String, serde_json::Value>> {
    let mut search_from = 0;
    while let Some(rel) = text[search_from..].find('{') {
        let start = search_from + rel;
        match balanced_json_fragment(&text[start..]) {
            Some(fragment) => {
                if let Ok(serde_json::Value::Object(object)) = serde_json::from_str(fragment) {
                    return Some(object);
                }
                search_from = start + 1;
            }
            None => search_from = start + 1,
        }
    }
    None
}

/// Lists, headings, or paragraph breaks.
fn has_structure(text: &str) -> bool {
    let has_list = text
        .lines()
        .any(|l| {
            let l = l.trim_start();
            l.starts_with("- ")
                || l.starts_with("* ")
                || l.chars().next().is_some_and(|c| c.is_ascii_digit()) && l.contains(". ")
        });
    let has_heading = text.lines().any(|l| l.trim_start().starts_with('#'));
    let has_paragraphs = text.contains("\n\n");
    has_list || has_heading || has_paragraphs
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::TestStatus;
    use crate::suite::definition::FieldType;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn input(response: &str) -> EvalInput<'_> {
        EvalInput {
            response,
            observed: &[],
            tracker_window: &[],
            window_end: Utc::now(),
        }
    }

    fn text_definition(min_words: usize, keywords: &[&str], structure: bool) -> TestDefinition {
        TestDefinition::new(
            "txt1",
            "s1",
            "Describe the araA gene",
            Expectation::TextAnalysis {
                min_words,
                required_keywords: keywords.iter().map(|s| s.to_string()).collect(),
                require_structure: structure,
            },
            6,
        )
    }

    #[test]
    fn test_text_all_checks_pass() {
        let def = text_definition(5, &["isomerase", "arabinose"], true);
        let response = "# araA\n\nThe araA gene encodes L-arabinose isomerase.\n\n- It acts on arabinose.";
        let verdict = evaluate_text(&def, &input(response)).unwrap();
        assert_eq!(verdict.score, 6);
        assert_eq!(verdict.status, TestStatus::Passed);
    }

    #[test]
    fn test_text_missing_keyword() {
        let def = text_definition(3, &["isomerase", "kinase"], false);
        let response = "The araA gene encodes an isomerase enzyme.";
        let verdict = evaluate_text(&def, &input(response)).unwrap();
        // 2 of 3 checks pass.
        assert_eq!(verdict.score, 4);
        assert!(verdict.errors[0].contains("kinase"));
    }

    #[test]
    fn test_text_too_short() {
        let def = text_definition(50, &[], false);
        let verdict = evaluate_text(&def, &input("Too short.")).unwrap();
        assert_eq!(verdict.score, 0);
        assert_eq!(verdict.status, TestStatus::Failed);
    }

    #[test]
    fn test_json_output_pass() {
        let mut field_types = BTreeMap::new();
        field_types.insert("gc_content".to_string(), FieldType::Number);
        field_types.insert("gene".to_string(), FieldType::String);
        let def = TestDefinition::new(
            "js1",
            "s1",
            "Report GC content as JSON",
            Expectation::JsonOutput {
                required_fields: vec!["gene".to_string(), "gc_content".to_string()],
                field_types,
            },
            4,
        );
        let response = r#"Here you go: {"gene": "araA", "gc_content": 0.56}"#;
        let verdict = evaluate_json(&def, &input(response)).unwrap();
        assert_eq!(verdict.score, 4);
        assert_eq!(verdict.status, TestStatus::Passed);
    }

    #[test]
    fn test_json_output_type_mismatch() {
        let mut field_types = BTreeMap::new();
        field_types.insert("gc_content".to_string(), FieldType::Number);
        let def = TestDefinition::new(
            "js2",
            "s1",
            "Report GC content as JSON",
            Expectation::JsonOutput {
                required_fields: vec!["gc_content".to_string()],
                field_types,
            },
            4,
        );
        let response = r#"{"gc_content": "fifty-six percent"}"#;
        let verdict = evaluate_json(&def, &input(response)).unwrap();
        assert_eq!(verdict.score, 0);
        assert!(verdict.errors[0].contains("wrong type"));
    }

    #[test]
    fn test_json_output_no_json() {
        let def = TestDefinition::new(
            "js3",
            "s1",
            "Report as JSON",
            Expectation::JsonOutput {
                required_fields: vec!["gene".to_string()],
                field_types: BTreeMap::new(),
            },
            4,
        );
        let verdict = evaluate_json(&def, &input("I prefer prose.")).unwrap();
        assert_eq!(verdict.status, TestStatus::Failed);
        assert!(verdict.errors[0].contains("No JSON object"));
    }

    #[test]
    fn test_generic_string_equality() {
        let def = TestDefinition::new(
            "g1",
            "s1",
            "Reply with the strand",
            Expectation::Generic {
                value: serde_json::json!("reverse"),
            },
            2,
        );
        assert_eq!(
            evaluate_generic(&def, &input("  reverse\n")).unwrap().status,
            TestStatus::Passed
        );
        assert_eq!(
            evaluate_generic(&def, &input("forward")).unwrap().status,
            TestStatus::Failed
        );
    }

    #[test]
    fn test_generic_numeric_equality() {
        let def = TestDefinition::new(
            "g2",
            "s1",
            "How many exons?",
            Expectation::Generic {
                value: serde_json::json!(3),
            },
            2,
        );
        assert_eq!(
            evaluate_generic(&def, &input("3")).unwrap().status,
            TestStatus::Passed
        );
    }
}
