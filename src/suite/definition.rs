//! Immutable test definitions.
//!
//! A [`TestDefinition`] pairs a natural-language instruction with a declared
//! expectation about what the agent should do: a specific tool call, a
//! multi-step workflow, a textual analysis, or a JSON payload. Definitions
//! are data; they never change during a run.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::runner::context::TestHook;

/// Default per-test timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Domain tag for grouping and statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Navigation,
    SequenceAnalysis,
    DataLoading,
    Editing,
    ExternalDatabase,
    Reporting,
    General,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Navigation => "navigation",
            Category::SequenceAnalysis => "sequence_analysis",
            Category::DataLoading => "data_loading",
            Category::Editing => "editing",
            Category::ExternalDatabase => "external_database",
            Category::Reporting => "reporting",
            Category::General => "general",
        };
        write!(f, "{}", name)
    }
}

/// How demanding the instruction is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    #[default]
    Medium,
    Complex,
}

/// Discriminant for the expectation shape; drives evaluator dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    FunctionCall,
    Workflow,
    TextAnalysis,
    JsonOutput,
    Generic,
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TestKind::FunctionCall => "function_call",
            TestKind::Workflow => "workflow",
            TestKind::TextAnalysis => "text_analysis",
            TestKind::JsonOutput => "json_output",
            TestKind::Generic => "generic",
        };
        write!(f, "{}", name)
    }
}

/// An expected parameter value.
///
/// Placeholders are parsed out of `<angle-bracket>` strings when definitions
/// are deserialized, so the matcher dispatches on a tag rather than sniffing
/// sentinel strings.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpectedValue {
    /// Concrete value that must match the observation.
    Value(serde_json::Value),
    /// Symbolic value matching any non-empty concrete value.
    Placeholder(String),
}

impl ExpectedValue {
    /// Convenience constructor for string values.
    pub fn string(s: impl Into<String>) -> Self {
        ExpectedValue::Value(serde_json::Value::String(s.into()))
    }

    /// Convenience constructor for integer values.
    pub fn int(n: i64) -> Self {
        ExpectedValue::Value(serde_json::json!(n))
    }
}

impl Serialize for ExpectedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ExpectedValue::Value(v) => v.serialize(serializer),
            ExpectedValue::Placeholder(name) => {
                serializer.serialize_str(&format!("<{}>", name))
            }
        }
    }
}

impl<'de> Deserialize<'de> for ExpectedValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        if let serde_json::Value::String(ref s) = value {
            if let Some(inner) = s.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
                if inner.is_empty() {
                    return Err(D::Error::custom("empty placeholder name"));
                }
                return Ok(ExpectedValue::Placeholder(inner.to_string()));
            }
        }
        Ok(ExpectedValue::Value(value))
    }
}

/// One expected tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectedCall {
    /// Exact tool name the agent must invoke.
    pub tool_name: String,
    /// Declared parameters; each one deducts a point on mismatch.
    #[serde(default)]
    pub parameters: BTreeMap<String, ExpectedValue>,
}

impl ExpectedCall {
    /// Creates an expected call with no declared parameters.
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            parameters: BTreeMap::new(),
        }
    }

    /// Declares one parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: ExpectedValue) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }
}

/// Declared expectation for a test, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expectation {
    /// One or many expected tool calls. The array form is matched in
    /// declared order.
    FunctionCall { calls: Vec<ExpectedCall> },
    /// Multi-step workflow over a required tool set.
    Workflow {
        #[serde(default)]
        expected_steps: Option<u32>,
        required_tools: Vec<String>,
        #[serde(default)]
        min_tool_calls: u32,
    },
    /// Free-text answer quality checks.
    TextAnalysis {
        min_words: usize,
        #[serde(default)]
        required_keywords: Vec<String>,
        #[serde(default)]
        require_structure: bool,
    },
    /// Structured JSON answer checks.
    JsonOutput {
        required_fields: Vec<String>,
        #[serde(default)]
        field_types: BTreeMap<String, FieldType>,
    },
    /// Equality against a single declared value.
    Generic { value: serde_json::Value },
}

impl Expectation {
    /// Single expected tool call.
    pub fn call(call: ExpectedCall) -> Self {
        Expectation::FunctionCall { calls: vec![call] }
    }

    /// Returns the kind tag for this expectation.
    pub fn kind(&self) -> TestKind {
        match self {
            Expectation::FunctionCall { .. } => TestKind::FunctionCall,
            Expectation::Workflow { .. } => TestKind::Workflow,
            Expectation::TextAnalysis { .. } => TestKind::TextAnalysis,
            Expectation::JsonOutput { .. } => TestKind::JsonOutput,
            Expectation::Generic { .. } => TestKind::Generic,
        }
    }
}

/// Primitive type tag for json_output field checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl FieldType {
    /// Returns true when `value` agrees with this tag.
    pub fn matches(&self, value: &serde_json::Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Array => value.is_array(),
            FieldType::Object => value.is_object(),
        }
    }
}

/// Immutable definition of one benchmark test.
#[derive(Clone, Serialize, Deserialize)]
pub struct TestDefinition {
    /// Stable identifier, unique within its suite.
    pub id: String,
    /// Human-readable name. Defaults to the id when loaded from a suite file.
    #[serde(default)]
    pub name: String,
    /// Owning suite id. Filled in by the registry when loaded from a suite
    /// file.
    #[serde(default)]
    pub suite_id: String,
    /// Domain tag for statistics breakdowns.
    pub category: Category,
    /// Instruction difficulty.
    #[serde(default)]
    pub complexity: Complexity,
    /// Natural-language prompt sent to the agent.
    pub instruction: String,
    /// Declared expectation; carries the test kind tag.
    pub expected: Expectation,
    /// Full score for a perfect outcome.
    pub max_score: u32,
    /// Extra credit (ordering bonuses and the like).
    #[serde(default = "default_bonus")]
    pub bonus_score: u32,
    /// Per-test timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Overrides the evaluator selected by the expectation kind.
    #[serde(default)]
    pub evaluator_id: Option<String>,
    /// Hook run before the instruction is dispatched.
    #[serde(skip)]
    pub setup: Option<Arc<dyn TestHook>>,
    /// Hook run after the verdict, on every exit path.
    #[serde(skip)]
    pub cleanup: Option<Arc<dyn TestHook>>,
}

fn default_bonus() -> u32 {
    1
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT.as_millis() as u64
}

impl fmt::Debug for TestDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestDefinition")
            .field("id", &self.id)
            .field("suite_id", &self.suite_id)
            .field("category", &self.category)
            .field("complexity", &self.complexity)
            .field("kind", &self.expected.kind())
            .field("max_score", &self.max_score)
            .field("timeout_ms", &self.timeout_ms)
            .field("has_setup", &self.setup.is_some())
            .field("has_cleanup", &self.cleanup.is_some())
            .finish()
    }
}

impl TestDefinition {
    /// Creates a definition with defaults for the optional fields.
    pub fn new(
        id: impl Into<String>,
        suite_id: impl Into<String>,
        instruction: impl Into<String>,
        expected: Expectation,
        max_score: u32,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            suite_id: suite_id.into(),
            category: Category::General,
            complexity: Complexity::Medium,
            instruction: instruction.into(),
            expected,
            max_score,
            bonus_score: default_bonus(),
            timeout_ms: default_timeout_ms(),
            evaluator_id: None,
            setup: None,
            cleanup: None,
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the category tag.
    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    /// Sets the complexity level.
    pub fn with_complexity(mut self, complexity: Complexity) -> Self {
        self.complexity = complexity;
        self
    }

    /// Sets the per-test timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Overrides the evaluator for this test.
    pub fn with_evaluator(mut self, evaluator_id: impl Into<String>) -> Self {
        self.evaluator_id = Some(evaluator_id.into());
        self
    }

    /// Attaches a setup hook.
    pub fn with_setup(mut self, hook: Arc<dyn TestHook>) -> Self {
        self.setup = Some(hook);
        self
    }

    /// Attaches a cleanup hook.
    pub fn with_cleanup(mut self, hook: Arc<dyn TestHook>) -> Self {
        self.cleanup = Some(hook);
        self
    }

    /// Returns the evaluator dispatch kind.
    pub fn kind(&self) -> TestKind {
        self.expected.kind()
    }

    /// Returns the timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Schema check applied at registration.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("test id must not be empty".to_string());
        }
        if self.instruction.trim().is_empty() {
            return Err("instruction must not be empty".to_string());
        }
        if self.max_score == 0 {
            return Err("max_score must be positive".to_string());
        }
        match &self.expected {
            Expectation::FunctionCall { calls } => {
                if calls.is_empty() {
                    return Err("function_call expectation declares no calls".to_string());
                }
                if calls.iter().any(|c| c.tool_name.trim().is_empty()) {
                    return Err("expected tool name must not be empty".to_string());
                }
            }
            Expectation::Workflow { required_tools, .. } => {
                if required_tools.is_empty() {
                    return Err("workflow expectation declares no required tools".to_string());
                }
            }
            Expectation::TextAnalysis { min_words, .. } => {
                if *min_words == 0 {
                    return Err("text_analysis expectation requires min_words > 0".to_string());
                }
            }
            Expectation::JsonOutput {
                required_fields, ..
            } => {
                if required_fields.is_empty() {
                    return Err("json_output expectation declares no required fields".to_string());
                }
            }
            Expectation::Generic { .. } => {}
        }
        Ok(())
    }
}
