//! Per-test execution context and lifecycle hooks.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::agent::AgentDriver;
use crate::config::ConfigProvider;
use crate::error::HookError;
use crate::events::EventSink;

/// Everything a single test execution may touch.
///
/// The context borrows shared services for the duration of one test and is
/// dropped on every exit path, so a hook can never hold the agent past its
/// own test.
#[derive(Clone)]
pub struct TestContext {
    /// Unique handle for this execution, distinct from the test id.
    pub execution_id: Uuid,
    /// Test this context belongs to.
    pub test_id: String,
    /// Owning suite.
    pub suite_id: String,
    /// Agent the instruction will be sent through.
    pub agent: Arc<dyn AgentDriver>,
    /// Configuration for data-directory and suite options.
    pub config: Arc<dyn ConfigProvider>,
    /// Sink the runner reports progress to.
    pub events: Arc<dyn EventSink>,
}

impl TestContext {
    pub fn new(
        test_id: impl Into<String>,
        suite_id: impl Into<String>,
        agent: Arc<dyn AgentDriver>,
        config: Arc<dyn ConfigProvider>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            test_id: test_id.into(),
            suite_id: suite_id.into(),
            agent,
            config,
            events,
        }
    }
}

impl std::fmt::Debug for TestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestContext")
            .field("execution_id", &self.execution_id)
            .field("test_id", &self.test_id)
            .field("suite_id", &self.suite_id)
            .finish()
    }
}

/// Setup or cleanup step attached to a test definition.
///
/// Setup failures abort the test with an `error` verdict; cleanup failures
/// downgrade to warnings so they never mask the verdict.
#[async_trait]
pub trait TestHook: Send + Sync {
    async fn run(&self, ctx: &TestContext) -> Result<(), HookError>;
}
