//! Scripted agent used by unit and integration tests.
//!
//! The scripted agent replays canned responses in order and lets tests stage
//! tracker records, delays, and transport failures without a live model.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::AgentError;

use super::{AgentDriver, ToolCallRecord};

/// One scripted exchange: the response to return and optional behavior.
#[derive(Debug, Clone)]
pub struct ScriptedTurn {
    /// Final text response returned from `send_instruction`.
    pub response: String,
    /// Tracker records appended when this turn is consumed.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Artificial latency before responding.
    pub delay: Duration,
    /// When set, the turn fails with a transport error instead of responding.
    pub transport_error: Option<String>,
}

impl ScriptedTurn {
    /// Creates a turn that returns the given response immediately.
    pub fn text(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            tool_calls: Vec::new(),
            delay: Duration::ZERO,
            transport_error: None,
        }
    }

    /// Attaches tracker records to this turn.
    pub fn with_tool_calls(mut self, calls: Vec<ToolCallRecord>) -> Self {
        self.tool_calls = calls;
        self
    }

    /// Adds artificial latency before the response is returned.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Makes the turn fail with a transport error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            response: String::new(),
            tool_calls: Vec::new(),
            delay: Duration::ZERO,
            transport_error: Some(message.into()),
        }
    }
}

/// Agent driver that replays a fixed script.
pub struct ScriptedAgent {
    turns: Vec<ScriptedTurn>,
    cursor: AtomicUsize,
    configured: bool,
    session: Mutex<Vec<ToolCallRecord>>,
    instructions_seen: Mutex<Vec<String>>,
}

impl ScriptedAgent {
    /// Creates a configured agent that replays `turns` in order.
    pub fn new(turns: Vec<ScriptedTurn>) -> Self {
        Self {
            turns,
            cursor: AtomicUsize::new(0),
            configured: true,
            session: Mutex::new(Vec::new()),
            instructions_seen: Mutex::new(Vec::new()),
        }
    }

    /// Creates an agent that reports itself as unconfigured.
    pub fn unconfigured() -> Self {
        Self {
            turns: Vec::new(),
            cursor: AtomicUsize::new(0),
            configured: false,
            session: Mutex::new(Vec::new()),
            instructions_seen: Mutex::new(Vec::new()),
        }
    }

    /// Instructions received so far, in order.
    pub fn instructions(&self) -> Vec<String> {
        self.instructions_seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of instructions dispatched to this agent.
    pub fn dispatch_count(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentDriver for ScriptedAgent {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn send_instruction(&self, text: &str) -> Result<String, AgentError> {
        self.instructions_seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(text.to_string());

        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        let turn = self
            .turns
            .get(index)
            .ok_or_else(|| AgentError::Transport("script exhausted".to_string()))?;

        if !turn.delay.is_zero() {
            tokio::time::sleep(turn.delay).await;
        }

        if let Some(ref message) = turn.transport_error {
            return Err(AgentError::Transport(message.clone()));
        }

        // Records are stamped when the turn is consumed so they land inside
        // the runner's execution window, mirroring a real driver recording
        // invocation times during the call.
        let now = chrono::Utc::now();
        self.session
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(turn.tool_calls.iter().cloned().map(|mut record| {
                record.started_at = now;
                record.finished_at = record.finished_at.map(|_| now);
                record
            }));

        Ok(turn.response.clone())
    }

    fn session_tool_calls(&self) -> Vec<ToolCallRecord> {
        self.session
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_turns_in_order() {
        let agent = ScriptedAgent::new(vec![
            ScriptedTurn::text("first"),
            ScriptedTurn::text("second"),
        ]);

        assert_eq!(agent.send_instruction("a").await.unwrap(), "first");
        assert_eq!(agent.send_instruction("b").await.unwrap(), "second");
        assert!(agent.send_instruction("c").await.is_err());
        assert_eq!(agent.instructions(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_tool_calls_accumulate_per_turn() {
        let agent = ScriptedAgent::new(vec![ScriptedTurn::text("ok").with_tool_calls(vec![
            ToolCallRecord::completed("search_gene_by_name", serde_json::Map::new()),
        ])]);

        assert!(agent.session_tool_calls().is_empty());
        agent.send_instruction("go").await.unwrap();
        assert_eq!(agent.session_tool_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_transport_error_turn() {
        let agent = ScriptedAgent::new(vec![ScriptedTurn::failing("socket closed")]);
        let err = agent.send_instruction("go").await.unwrap_err();
        assert!(err.to_string().contains("socket closed"));
    }
}
