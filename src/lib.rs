//! genobench: Tool-calling benchmark harness for the genome workbench
//! assistant.
//!
//! This library scores how reliably an LLM-driven assistant translates
//! natural-language instructions into correct tool invocations. It treats the
//! agent as a black box behind [`agent::AgentDriver`], recovers what the
//! agent actually did from tracker records and response text, and grades the
//! outcome against declarative test definitions.

pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod eval;
pub mod events;
pub mod extract;
pub mod metrics;
pub mod report;
pub mod runner;
pub mod stats;
pub mod suite;

// Re-export commonly used error types
pub use error::{
    AgentError, ConfigError, EvalError, ExtractError, HookError, RegistryError, ReportError,
    RunError,
};
