//! Observable metrics attached to every verdict.

use serde::{Deserialize, Serialize};

/// Per-test measurements collected by the single-test runner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestMetrics {
    /// Wall-clock time from dispatch to response, in milliseconds.
    pub response_time_ms: u64,
    /// Length of the final response in bytes.
    pub response_length: usize,
    /// Rough token count, `ceil(response_length / 4)`.
    pub token_estimate: usize,
    /// Number of distinct tool invocations the extractor detected.
    pub detected_tool_count: usize,
    /// Bounded 0-10 difficulty estimate for the instruction.
    pub instruction_complexity: u8,
}

impl TestMetrics {
    /// Builds metrics for a completed response.
    pub fn for_response(
        instruction: &str,
        response: &str,
        response_time_ms: u64,
        detected_tool_count: usize,
    ) -> Self {
        Self {
            response_time_ms,
            response_length: response.len(),
            token_estimate: estimate_tokens(response),
            detected_tool_count,
            instruction_complexity: instruction_complexity(instruction),
        }
    }
}

/// Estimates token count at four bytes per token, rounded up.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

const IMPERATIVE_VERBS: &[&str] = &[
    "search", "find", "navigate", "go", "load", "open", "compute", "calculate", "show",
    "display", "export", "save", "copy", "paste", "reverse", "translate", "run", "compare",
    "align", "analyze",
];

/// Scores how demanding an instruction is on a 0-10 scale, combining length,
/// clause count, and imperative-verb density.
pub fn instruction_complexity(instruction: &str) -> u8 {
    let words: Vec<&str> = instruction.split_whitespace().collect();
    if words.is_empty() {
        return 0;
    }

    // Length: up to 4 points at 40+ words.
    let length_points = (words.len() / 10).min(4) as u32;

    // Clauses: commas plus connective words, up to 3 points.
    let connectives = words
        .iter()
        .filter(|w| {
            let w = w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
            matches!(w.as_str(), "and" | "then" | "after" | "before" | "while")
        })
        .count();
    let clause_points = ((instruction.matches(',').count() + connectives) as u32).min(3);

    // Imperative verbs: up to 3 points.
    let verb_count = words
        .iter()
        .filter(|w| {
            let w = w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
            IMPERATIVE_VERBS.contains(&w.as_str())
        })
        .count();
    let verb_points = (verb_count as u32).min(3);

    (length_points + clause_points + verb_points).min(10) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_estimate_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn test_simple_instruction_scores_low() {
        let score = instruction_complexity("Search for lacZ.");
        assert!(score <= 2, "got {}", score);
    }

    #[test]
    fn test_compound_instruction_scores_higher() {
        let simple = instruction_complexity("Show the sequence.");
        let compound = instruction_complexity(
            "Load the E. coli genome, navigate to the araA locus, compute the GC content \
             of the region, and then export the reverse complement to a FASTA file.",
        );
        assert!(compound > simple);
        assert!(compound <= 10);
    }

    #[test]
    fn test_empty_instruction() {
        assert_eq!(instruction_complexity("   "), 0);
    }

    #[test]
    fn test_metrics_for_response() {
        let metrics = TestMetrics::for_response("Search for lacZ.", "Found it.", 42, 1);
        assert_eq!(metrics.response_time_ms, 42);
        assert_eq!(metrics.response_length, 9);
        assert_eq!(metrics.token_estimate, 3);
        assert_eq!(metrics.detected_tool_count, 1);
    }
}
