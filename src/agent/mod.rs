//! Agent driver interface.
//!
//! The harness treats the agent as a black box: it accepts a natural-language
//! instruction, resolves any tool calls internally, and returns a final text
//! response. Ground truth about what the agent actually executed comes from
//! its tool execution tracker, exposed here as [`ToolCallRecord`]s.

pub mod mock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AgentError;

pub use mock::ScriptedAgent;

/// Status of a tracked tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    Completed,
    Failed,
    Running,
}

/// One entry from the agent's tool execution tracker.
///
/// Entries are append-only from the agent's side; the harness only reads
/// them, and only within a bounded recent window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// Name of the tool that was invoked.
    pub tool_name: String,
    /// Named arguments passed to the tool.
    pub parameters: serde_json::Map<String, serde_json::Value>,
    /// Invocation status.
    pub status: ToolCallStatus,
    /// When the invocation started.
    pub started_at: DateTime<Utc>,
    /// When the invocation ended, if it has.
    pub finished_at: Option<DateTime<Utc>>,
    /// Error message for failed invocations.
    pub error: Option<String>,
}

impl ToolCallRecord {
    /// Creates a completed record with the given parameters.
    pub fn completed(
        tool_name: impl Into<String>,
        parameters: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        let now = Utc::now();
        Self {
            tool_name: tool_name.into(),
            parameters,
            status: ToolCallStatus::Completed,
            started_at: now,
            finished_at: Some(now),
            error: None,
        }
    }

    /// Creates a failed record with an error message.
    pub fn failed(tool_name: impl Into<String>, error: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            tool_name: tool_name.into(),
            parameters: serde_json::Map::new(),
            status: ToolCallStatus::Failed,
            started_at: now,
            finished_at: Some(now),
            error: Some(error.into()),
        }
    }
}

/// Black-box interface to the assistant under test.
#[async_trait]
pub trait AgentDriver: Send + Sync {
    /// Returns true when the agent has everything it needs to accept
    /// instructions. Must be checked before [`send_instruction`].
    ///
    /// [`send_instruction`]: AgentDriver::send_instruction
    fn is_configured(&self) -> bool;

    /// Sends one instruction and waits for the final textual response.
    async fn send_instruction(&self, text: &str) -> Result<String, AgentError>;

    /// Returns the tool invocations recorded for the current session.
    fn session_tool_calls(&self) -> Vec<ToolCallRecord>;
}

/// Filters tracker records down to those whose start time falls inside the
/// window `[since, until]`.
pub fn tracker_window(
    records: &[ToolCallRecord],
    since: DateTime<Utc>,
    until: DateTime<Utc>,
) -> Vec<ToolCallRecord> {
    records
        .iter()
        .filter(|r| r.started_at >= since && r.started_at <= until)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_tracker_window_bounds() {
        let now = Utc::now();
        let mut old = ToolCallRecord::completed("compute_gc", serde_json::Map::new());
        old.started_at = now - Duration::seconds(120);
        let recent = ToolCallRecord::completed("compute_gc", serde_json::Map::new());

        let window = tracker_window(&[old, recent], now - Duration::seconds(30), now + Duration::seconds(1));
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn test_failed_record_carries_error() {
        let record = ToolCallRecord::failed("blast_search", "connection refused");
        assert_eq!(record.status, ToolCallStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("connection refused"));
    }
}
