//! Pattern configuration for the tool-call extractor.
//!
//! The allow-list of tool names and the phrase inventory are configuration
//! data supplied by the caller; this module compiles them into the regex set
//! the extractor scans with. Nothing domain-specific is hard-coded here.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ExtractError;

/// Caller-supplied extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Tool names the extractor is allowed to recognize in free text.
    pub known_tools: Vec<String>,
    /// Verbs that mark a tool mention as an execution claim.
    #[serde(default = "default_verbs")]
    pub invocation_verbs: Vec<String>,
    /// Extra success-phrase patterns appended to the built-in inventory.
    #[serde(default)]
    pub extra_success_patterns: Vec<String>,
}

fn default_verbs() -> Vec<String> {
    [
        "executed", "invoked", "called", "ran", "used", "using", "loaded", "navigated",
        "performed", "triggered",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl ExtractorConfig {
    /// Creates a configuration for the given allow-list.
    pub fn for_tools<I, S>(tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known_tools: tools.into_iter().map(Into::into).collect(),
            invocation_verbs: default_verbs(),
            extra_success_patterns: Vec::new(),
        }
    }
}

/// Compiled regex set for one extractor instance.
#[derive(Debug)]
pub struct PatternSet {
    /// Matches "tool execution completed: <name> succeeded|failed".
    pub completion: Regex,
    /// Explicit success phrasing used as corroborating evidence.
    pub success_phrases: Vec<Regex>,
    /// Per-tool mention patterns, parallel to `ExtractorConfig::known_tools`.
    pub tool_mentions: Vec<(String, Regex)>,
    /// Verb immediately preceding a tool mention.
    pub invocation_verb: Regex,
    /// Quoted or backtick-fenced identifier.
    pub quoted_ident: Regex,
    /// Decimal integer, thousands separators allowed.
    pub integer: Regex,
    /// Chromosome-looking token.
    pub chromosome: Regex,
    /// Case-sensitivity flag phrasing.
    pub case_flag: Regex,
}

impl PatternSet {
    /// Compiles the pattern set from configuration.
    pub fn compile(config: &ExtractorConfig) -> Result<Self, ExtractError> {
        let mut success_phrases = vec![
            Regex::new(r"(?i)\bsuccessfully\s+(?:executed|loaded|navigated|ran|invoked|called|completed|searched)\b")?,
            Regex::new(r"(?i)\bI'?ve\s+successfully\b")?,
            Regex::new(r"(?i)\btool\s+execution\s+completed\b")?,
        ];
        for pattern in &config.extra_success_patterns {
            success_phrases.push(Regex::new(pattern).map_err(|e| {
                ExtractError::InvalidPattern {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                }
            })?);
        }

        let mut tool_mentions = Vec::with_capacity(config.known_tools.len());
        for tool in &config.known_tools {
            let pattern = format!(r#"(?i)(["'`]?)\b{}\b(["'`]?)"#, regex::escape(tool));
            tool_mentions.push((tool.clone(), Regex::new(&pattern)?));
        }

        let verbs = config
            .invocation_verbs
            .iter()
            .map(|v| regex::escape(v))
            .collect::<Vec<_>>()
            .join("|");
        let invocation_verb = Regex::new(&format!(r"(?i)\b(?:{})\b", verbs))?;

        Ok(Self {
            completion: Regex::new(
                r#"(?i)tool\s+execution\s+completed:?\s*["'`]?([A-Za-z0-9_]+)["'`]?\s*(succeeded|failed)"#,
            )?,
            success_phrases,
            tool_mentions,
            invocation_verb,
            quoted_ident: Regex::new(r#"["'`]([^"'`\n]{1,64})["'`]"#)?,
            integer: Regex::new(r"\b\d{1,3}(?:,\d{3})+\b|\b\d+\b")?,
            chromosome: Regex::new(
                r"(?i:\bchr[0-9xym][0-9]?\b)|(?i:\bchromosome\s+([A-Za-z0-9_-]+))|\b[A-Z][A-Z0-9]+-[A-Z0-9]+\b",
            )?,
            case_flag: Regex::new(r"(?i)\bcase[\s-]?(in)?sensitive\b")?,
        })
    }

    /// Returns true when `sentence` contains explicit success phrasing.
    pub fn has_success_phrase(&self, sentence: &str) -> bool {
        self.success_phrases.iter().any(|re| re.is_match(sentence))
    }
}
