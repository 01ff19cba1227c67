//! Tool-call extraction from agent responses.
//!
//! The agent reports what it did in prose, so ground truth has to be
//! recovered from heterogeneous evidence: tracker records (highest trust),
//! explicit success phrases, inline JSON fragments, and verb-plus-name
//! mentions over a caller-supplied allow-list. Each recovered invocation
//! carries a 0-100 confidence and the evidence class it came from.

pub mod patterns;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::agent::{ToolCallRecord, ToolCallStatus};
use crate::error::ExtractError;

pub use patterns::{ExtractorConfig, PatternSet};

/// Where an observation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Evidence {
    /// Completed record in the tool execution tracker.
    Tracker,
    /// Explicit "tool execution completed" / "successfully ..." phrasing.
    SuccessPhrase,
    /// JSON fragment embedded in the response text.
    InlineJson,
    /// Allow-listed tool name preceded by an invocation verb.
    VerbPattern,
}

/// One reconstructed tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservedCall {
    /// Tool the agent is believed to have invoked.
    pub tool_name: String,
    /// Reconstructed named arguments.
    pub parameters: Map<String, Value>,
    /// Evidence class behind this observation.
    pub evidence: Evidence,
    /// Belief strength, 0-100.
    pub confidence: u8,
}

impl ObservedCall {
    /// Creates a full-confidence observation from a tracker record.
    pub fn from_tracker(record: &ToolCallRecord) -> Self {
        Self {
            tool_name: record.tool_name.clone(),
            parameters: record.parameters.clone(),
            evidence: Evidence::Tracker,
            confidence: 100,
        }
    }
}

/// Parses agent responses into deduplicated, confidence-ranked observations.
#[derive(Debug)]
pub struct ToolCallExtractor {
    patterns: PatternSet,
}

impl ToolCallExtractor {
    /// Compiles an extractor from caller-supplied configuration.
    pub fn new(config: &ExtractorConfig) -> Result<Self, ExtractError> {
        Ok(Self {
            patterns: PatternSet::compile(config)?,
        })
    }

    /// Extracts observations from a response plus the tracker window for the
    /// test. Output order follows first appearance: tracker records first,
    /// then textual evidence by position. Deterministic for fixed input.
    pub fn extract(&self, response: &str, tracker: &[ToolCallRecord]) -> Vec<ObservedCall> {
        let mut merged = OrderedObservations::new();

        for record in tracker {
            if record.status == ToolCallStatus::Completed {
                merged.push(ObservedCall::from_tracker(record));
            }
        }

        for observed in self.scan_completions(response) {
            merged.push(observed);
        }
        for observed in self.scan_inline_json(response) {
            merged.push(observed);
        }
        for observed in self.scan_mentions(response) {
            merged.push(observed);
        }

        let calls = merged.into_vec();
        debug!(count = calls.len(), "Extracted tool observations");
        calls
    }

    /// Signal 2: explicit "tool execution completed: <name> succeeded".
    fn scan_completions(&self, response: &str) -> Vec<ObservedCall> {
        let mut found = Vec::new();
        for caps in self.patterns.completion.captures_iter(response) {
            if !caps[2].eq_ignore_ascii_case("succeeded") {
                continue;
            }
            let offset = caps.get(0).map(|m| m.start()).unwrap_or(0);
            let sentence = sentence_around(response, offset);
            let parameters = self.reconstruct_parameters(&caps[1], sentence);
            let confidence = score_confidence(true, false, !parameters.is_empty());
            found.push(ObservedCall {
                tool_name: caps[1].to_string(),
                parameters,
                evidence: Evidence::SuccessPhrase,
                confidence,
            });
        }
        found
    }

    /// Signal 3: JSON fragments carrying a `tool_name` field.
    fn scan_inline_json(&self, response: &str) -> Vec<ObservedCall> {
        let mut found = Vec::new();
        let mut search_from = 0;
        while let Some(rel) = response[search_from..].find("{") {
            let start = search_from + rel;
            match balanced_json_fragment(&response[start..]) {
                Some(fragment) => {
                    search_from = start + fragment.len();
                    if !fragment.contains("\"tool_name\"") {
                        continue;
                    }
                    if let Ok(Value::Object(object)) = serde_json::from_str(fragment) {
                        if let Some(observed) = observation_from_object(object) {
                            trace!(tool = %observed.tool_name, "Parsed inline tool call");
                            found.push(observed);
                        }
                    }
                }
                None => search_from = start + 1,
            }
        }
        found
    }

    /// Signal 4: verb-plus-name mentions over the allow-list.
    fn scan_mentions(&self, response: &str) -> Vec<ObservedCall> {
        // Collected by text position so dedup order is stable.
        let mut hits: Vec<(usize, ObservedCall)> = Vec::new();

        for (tool, re) in &self.patterns.tool_mentions {
            for caps in re.captures_iter(response) {
                let whole = match caps.get(0) {
                    Some(m) => m,
                    None => continue,
                };
                let fenced = !caps[1].is_empty() || !caps[2].is_empty();
                let sentence = sentence_around(response, whole.start());
                let success = self.patterns.has_success_phrase(sentence);
                let verbed = self
                    .patterns
                    .invocation_verb
                    .is_match(&sentence[..whole.start() - sentence_start(response, whole.start())]);

                // A bare mention is not an execution claim.
                if !fenced && !success && !verbed {
                    continue;
                }

                let parameters = self.reconstruct_parameters(tool, sentence);
                let confidence = score_confidence(success, fenced, !parameters.is_empty());
                let evidence = if success {
                    Evidence::SuccessPhrase
                } else {
                    Evidence::VerbPattern
                };
                hits.push((
                    whole.start(),
                    ObservedCall {
                        tool_name: tool.clone(),
                        parameters,
                        evidence,
                        confidence,
                    },
                ));
            }
        }

        hits.sort_by_key(|(pos, _)| *pos);
        hits.into_iter().map(|(_, call)| call).collect()
    }

    /// Signal 5: plausible argument values from the sentence around a call.
    fn reconstruct_parameters(&self, tool: &str, sentence: &str) -> Map<String, Value> {
        let mut parameters = Map::new();

        // Quoted identifiers become a named argument. The word just before
        // the quote picks the key when it names one; otherwise search tools
        // take "query" and everything else takes "name".
        for caps in self.patterns.quoted_ident.captures_iter(sentence) {
            let whole = match caps.get(0) {
                Some(m) => m,
                None => continue,
            };
            let ident = caps[1].trim();
            if ident.is_empty() || ident.eq_ignore_ascii_case(tool) {
                continue;
            }
            let fallback = if tool.contains("search") { "query" } else { "name" };
            let key = parameter_key_before(&sentence[..whole.start()]).unwrap_or(fallback);
            parameters.insert(key.to_string(), Value::String(ident.to_string()));
            break;
        }

        // Decimal integers become coordinates: one is a position, two are a
        // start/end range.
        let integers: Vec<i64> = self
            .patterns
            .integer
            .find_iter(sentence)
            .filter_map(|m| m.as_str().replace(',', "").parse().ok())
            .take(2)
            .collect();
        match integers.as_slice() {
            [position] => {
                parameters.insert("position".to_string(), Value::from(*position));
            }
            [start, end] => {
                parameters.insert("start".to_string(), Value::from(*start));
                parameters.insert("end".to_string(), Value::from(*end));
            }
            _ => {}
        }

        if let Some(m) = self.patterns.chromosome.find(sentence) {
            let token = m
                .as_str()
                .trim_start_matches("chromosome")
                .trim()
                .trim_matches('"');
            if !token.is_empty() {
                parameters.insert("chromosome".to_string(), Value::String(token.to_string()));
            }
        }

        if let Some(caps) = self.patterns.case_flag.captures(sentence) {
            parameters.insert(
                "case_sensitive".to_string(),
                Value::Bool(caps.get(1).is_none()),
            );
        }

        parameters
    }
}

/// Words an agent narrates right before a quoted value, mapped to the
/// parameter key they announce.
const PARAM_KEYWORDS: &[(&str, &str)] = &[
    ("name", "name"),
    ("query", "query"),
    ("gene", "name"),
    ("path", "path"),
    ("file", "path"),
    ("term", "query"),
];

/// The last word of `prefix`, when it announces a known parameter key.
fn parameter_key_before(prefix: &str) -> Option<&'static str> {
    let last = prefix
        .rsplit(|c: char| !c.is_alphanumeric() && c != '_')
        .find(|w| !w.is_empty())?
        .to_lowercase();
    PARAM_KEYWORDS
        .iter()
        .find(|(word, _)| *word == last)
        .map(|(_, key)| *key)
}

/// Confidence model: base 50, +30 explicit success phrasing, +20 fenced
/// name, +10 nearby parameters, capped at 100.
fn score_confidence(success_phrase: bool, fenced: bool, has_params: bool) -> u8 {
    let mut confidence = 50u32;
    if success_phrase {
        confidence += 30;
    }
    if fenced {
        confidence += 20;
    }
    if has_params {
        confidence += 10;
    }
    confidence.min(100) as u8
}

/// Builds an observation from a parsed inline JSON object.
fn observation_from_object(mut object: Map<String, Value>) -> Option<ObservedCall> {
    let tool_name = match object.remove("tool_name") {
        Some(Value::String(s)) if !s.trim().is_empty() => s,
        _ => return None,
    };

    let parameters = ["parameters", "params", "arguments"]
        .iter()
        .find_map(|key| match object.remove(*key) {
            Some(Value::Object(map)) => Some(map),
            _ => None,
        })
        .unwrap_or(object);

    let confidence = score_confidence(false, true, !parameters.is_empty());
    Some(ObservedCall {
        tool_name,
        parameters,
        evidence: Evidence::InlineJson,
        confidence,
    })
}

/// Returns the first balanced `{...}` fragment at the start of `text`,
/// respecting string literals.
pub(crate) fn balanced_json_fragment(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (index, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[..index + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Byte offset where the sentence containing `offset` starts.
fn sentence_start(text: &str, offset: usize) -> usize {
    text[..offset]
        .rfind(['.', '!', '?', '\n'])
        .map(|i| i + 1)
        .unwrap_or(0)
}

/// The sentence of `text` containing byte `offset`.
fn sentence_around(text: &str, offset: usize) -> &str {
    let start = sentence_start(text, offset);
    let end = text[offset..]
        .find(['.', '!', '?', '\n'])
        .map(|i| offset + i)
        .unwrap_or(text.len());
    &text[start..end]
}

/// Keeps the highest-confidence observation per tool name while preserving
/// first-appearance order for downstream workflow checks.
struct OrderedObservations {
    order: Vec<String>,
    best: std::collections::HashMap<String, ObservedCall>,
}

impl OrderedObservations {
    fn new() -> Self {
        Self {
            order: Vec::new(),
            best: std::collections::HashMap::new(),
        }
    }

    fn push(&mut self, call: ObservedCall) {
        match self.best.get_mut(&call.tool_name) {
            Some(existing) => {
                if call.confidence > existing.confidence {
                    *existing = call;
                }
            }
            None => {
                self.order.push(call.tool_name.clone());
                self.best.insert(call.tool_name.clone(), call);
            }
        }
    }

    fn into_vec(mut self) -> Vec<ObservedCall> {
        self.order
            .iter()
            .filter_map(|name| self.best.remove(name))
            .collect()
    }
}
