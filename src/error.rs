//! Error types for genobench operations.
//!
//! Defines error types for the major subsystems:
//! - Suite registry and test definitions
//! - Agent driver transport
//! - Tool-call extraction
//! - Evaluation
//! - Run orchestration
//! - Report generation
//! - Configuration

use thiserror::Error;

/// Errors that can occur during registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Suite '{0}' not found in registry")]
    SuiteNotFound(String),

    #[error("Test '{0}' not found in registry")]
    TestNotFound(String),

    #[error("Suite '{0}' already registered")]
    DuplicateSuite(String),

    #[error("Invalid test definition '{id}': {reason}")]
    InvalidDefinition { id: String, reason: String },

    #[error("Suite file parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur when talking to the agent driver.
///
/// Per-test agent failures become `error` verdicts rather than run errors,
/// so this only carries what a driver can actually report.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Agent transport failed: {0}")]
    Transport(String),
}

/// Errors that can occur during tool-call extraction.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid extraction pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

/// Errors that can occur during evaluation.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("Unknown evaluator '{0}'")]
    UnknownEvaluator(String),

    #[error("Expectation shape does not match test kind '{kind}': {reason}")]
    ExpectationMismatch { kind: String, reason: String },
}

/// Errors that abort a run before any test is dispatched. Per-test
/// failures (timeouts, transport, evaluation) become `error` verdicts
/// instead.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write report '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by per-test setup and cleanup hooks.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("Hook failed: {0}")]
    Failed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Agent is not configured; refusing to start run")]
    AgentNotConfigured,

    #[error("Default data directory is not set")]
    MissingDefaultDirectory,

    #[error("Default data directory '{0}' does not exist")]
    DirectoryNotFound(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
