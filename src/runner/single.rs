//! Executes one test end to end: dispatch, extraction, evaluation.

use std::time::Instant;

use chrono::Utc;
use tracing::{debug, warn};

use crate::agent::tracker_window;
use crate::error::ExtractError;
use crate::eval::{EvalInput, Evaluator, Verdict};
use crate::extract::{ExtractorConfig, ToolCallExtractor};
use crate::metrics::TestMetrics;
use crate::suite::definition::TestDefinition;

use super::context::TestContext;
use super::control::RunControl;

/// Runs a single test against an agent and scores the outcome.
///
/// A test always produces exactly one verdict: evaluation problems, agent
/// failures, and timeouts become `error` verdicts rather than panics, so a
/// bad test never takes the suite down with it.
pub struct TestRunner {
    extractor: ToolCallExtractor,
    evaluator: Evaluator,
}

impl TestRunner {
    /// Builds a runner over the given tool allow-list.
    pub fn new(extractor_config: &ExtractorConfig, evaluator: Evaluator) -> Result<Self, ExtractError> {
        Ok(Self {
            extractor: ToolCallExtractor::new(extractor_config)?,
            evaluator,
        })
    }

    /// Runs one test to a verdict.
    ///
    /// State moves pending -> running -> one of passed/failed/error/cancelled.
    /// The cancel flag is honored at two points: before dispatch (no
    /// instruction is sent) and after the response arrives (the response is
    /// discarded). An instruction already in flight is never interrupted.
    pub async fn run(
        &self,
        definition: &TestDefinition,
        ctx: &TestContext,
        control: &RunControl,
    ) -> Verdict {
        let clock = Instant::now();

        if control.is_cancelled() {
            return Verdict::cancelled(&definition.id, definition.max_score);
        }

        if let Some(ref setup) = definition.setup {
            if let Err(e) = setup.run(ctx).await {
                let mut verdict = Verdict::error(
                    &definition.id,
                    definition.max_score,
                    format!("Setup failed: {}", e),
                );
                verdict.metrics = self.empty_response_metrics(definition, &clock);
                return self.finish(definition, ctx, verdict).await;
            }
        }

        let window_start = Utc::now();
        debug!(test_id = %definition.id, timeout_ms = definition.timeout_ms, "Dispatching instruction");

        let response = match tokio::time::timeout(
            definition.timeout(),
            ctx.agent.send_instruction(&definition.instruction),
        )
        .await
        {
            Err(_) => {
                let mut verdict = Verdict::error(
                    &definition.id,
                    definition.max_score,
                    format!("Test timeout after {} ms", definition.timeout_ms),
                );
                verdict.metrics = self.empty_response_metrics(definition, &clock);
                return self.finish(definition, ctx, verdict).await;
            }
            Ok(Err(e)) => {
                let mut verdict = Verdict::error(
                    &definition.id,
                    definition.max_score,
                    format!("Agent error: {}", e),
                );
                verdict.metrics = self.empty_response_metrics(definition, &clock);
                return self.finish(definition, ctx, verdict).await;
            }
            Ok(Ok(response)) => response,
        };

        // A cancel that landed while the instruction was in flight wins over
        // the response.
        if control.is_cancelled() {
            let mut verdict = Verdict::cancelled(&definition.id, definition.max_score);
            verdict.metrics = self.empty_response_metrics(definition, &clock);
            return self.finish(definition, ctx, verdict).await;
        }

        let window_end = Utc::now();
        let elapsed_ms = clock.elapsed().as_millis() as u64;

        let session = ctx.agent.session_tool_calls();
        let tracker = tracker_window(&session, window_start, window_end);
        let observed = self.extractor.extract(&response, &tracker);
        let metrics = TestMetrics::for_response(
            &definition.instruction,
            &response,
            elapsed_ms,
            observed.len(),
        );

        let input = EvalInput {
            response: &response,
            observed: &observed,
            tracker_window: &tracker,
            window_end,
        };

        let mut verdict = match self.evaluator.evaluate(definition, &input) {
            Ok(verdict) => verdict,
            Err(e) => Verdict::error(
                &definition.id,
                definition.max_score,
                format!("Evaluation error: {}", e),
            ),
        };
        verdict.metrics = metrics;

        self.finish(definition, ctx, verdict).await
    }

    /// Metrics for a verdict reached without a usable response: the clock
    /// time still counts, the response length is zero.
    fn empty_response_metrics(&self, definition: &TestDefinition, clock: &Instant) -> TestMetrics {
        TestMetrics::for_response(
            &definition.instruction,
            "",
            clock.elapsed().as_millis() as u64,
            0,
        )
    }

    /// Runs the cleanup hook on every exit path. Cleanup failures become
    /// warnings so they never mask the verdict.
    async fn finish(
        &self,
        definition: &TestDefinition,
        ctx: &TestContext,
        mut verdict: Verdict,
    ) -> Verdict {
        if let Some(ref cleanup) = definition.cleanup {
            if let Err(e) = cleanup.run(ctx).await {
                warn!(test_id = %definition.id, error = %e, "Cleanup hook failed");
                verdict.warnings.push(format!("Cleanup failed: {}", e));
            }
        }
        verdict
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::agent::{ScriptedAgent, ToolCallRecord};
    use crate::agent::mock::ScriptedTurn;
    use crate::config::BenchConfig;
    use crate::error::HookError;
    use crate::eval::TestStatus;
    use crate::events::NullSink;
    use crate::runner::context::TestHook;
    use crate::suite::definition::{ExpectedCall, ExpectedValue, Expectation};

    fn runner(tools: &[&str]) -> TestRunner {
        let config = ExtractorConfig::for_tools(tools.iter().map(|t| t.to_string()));
        TestRunner::new(&config, Evaluator::new()).unwrap()
    }

    fn context(agent: Arc<ScriptedAgent>) -> TestContext {
        TestContext::new(
            "t-001",
            "s-001",
            agent,
            Arc::new(BenchConfig::default()),
            Arc::new(NullSink),
        )
    }

    fn gene_search_test() -> TestDefinition {
        TestDefinition::new(
            "t-001",
            "s-001",
            "Search for the gene \"lacZ\".",
            Expectation::call(
                ExpectedCall::new("search_gene_by_name")
                    .with_param("name", ExpectedValue::string("lacZ")),
            ),
            5,
        )
    }

    #[tokio::test]
    async fn test_passes_on_tracker_evidence() {
        let mut params = serde_json::Map::new();
        params.insert("name".to_string(), serde_json::json!("lacZ"));
        let agent = Arc::new(ScriptedAgent::new(vec![ScriptedTurn::text(
            "Found lacZ on the forward strand.",
        )
        .with_tool_calls(vec![ToolCallRecord::completed(
            "search_gene_by_name",
            params,
        )])]));

        let verdict = runner(&["search_gene_by_name"])
            .run(&gene_search_test(), &context(agent), &RunControl::new())
            .await;

        assert_eq!(verdict.status, TestStatus::Passed);
        assert_eq!(verdict.score, 5);
        assert_eq!(verdict.metrics.detected_tool_count, 1);
    }

    #[tokio::test]
    async fn test_timeout_yields_error_verdict() {
        let agent = Arc::new(ScriptedAgent::new(vec![
            ScriptedTurn::text("too late").with_delay(Duration::from_millis(200)),
        ]));
        let definition = gene_search_test().with_timeout(Duration::from_millis(20));

        let verdict = runner(&["search_gene_by_name"])
            .run(&definition, &context(agent), &RunControl::new())
            .await;

        assert_eq!(verdict.status, TestStatus::Error);
        assert!(verdict.errors[0].contains("timeout"));
        // The clock keeps counting even though no response arrived.
        assert!(verdict.metrics.response_time_ms >= 20);
        assert_eq!(verdict.metrics.response_length, 0);
        assert!(verdict.metrics.instruction_complexity > 0);
    }

    #[tokio::test]
    async fn test_transport_failure_yields_error_verdict() {
        let agent = Arc::new(ScriptedAgent::new(vec![ScriptedTurn::failing(
            "socket closed",
        )]));

        let verdict = runner(&["search_gene_by_name"])
            .run(&gene_search_test(), &context(agent), &RunControl::new())
            .await;

        assert_eq!(verdict.status, TestStatus::Error);
        assert!(verdict.errors[0].contains("socket closed"));
        assert_eq!(verdict.metrics.response_length, 0);
        assert!(verdict.metrics.instruction_complexity > 0);
    }

    #[tokio::test]
    async fn test_cancel_before_dispatch_skips_agent() {
        let agent = Arc::new(ScriptedAgent::new(vec![ScriptedTurn::text("never sent")]));
        let control = RunControl::new();
        control.cancel();

        let verdict = runner(&["search_gene_by_name"])
            .run(&gene_search_test(), &context(agent.clone()), &control)
            .await;

        assert_eq!(verdict.status, TestStatus::Cancelled);
        assert_eq!(agent.dispatch_count(), 0);
    }

    #[tokio::test]
    async fn test_setup_failure_aborts_with_error() {
        struct Broken;
        #[async_trait]
        impl TestHook for Broken {
            async fn run(&self, _ctx: &TestContext) -> Result<(), HookError> {
                Err(HookError::Failed("no genome loaded".to_string()))
            }
        }

        let agent = Arc::new(ScriptedAgent::new(vec![ScriptedTurn::text("ok")]));
        let definition = gene_search_test().with_setup(Arc::new(Broken));

        let verdict = runner(&["search_gene_by_name"])
            .run(&definition, &context(agent.clone()), &RunControl::new())
            .await;

        assert_eq!(verdict.status, TestStatus::Error);
        assert!(verdict.errors[0].contains("no genome loaded"));
        assert_eq!(agent.dispatch_count(), 0);
        assert!(verdict.metrics.instruction_complexity > 0);
    }

    #[tokio::test]
    async fn test_cleanup_failure_is_warning_only() {
        struct Flaky;
        #[async_trait]
        impl TestHook for Flaky {
            async fn run(&self, _ctx: &TestContext) -> Result<(), HookError> {
                Err(HookError::Failed("temp file left behind".to_string()))
            }
        }

        let mut params = serde_json::Map::new();
        params.insert("name".to_string(), serde_json::json!("lacZ"));
        let agent = Arc::new(ScriptedAgent::new(vec![ScriptedTurn::text("Found it.")
            .with_tool_calls(vec![ToolCallRecord::completed(
                "search_gene_by_name",
                params,
            )])]));
        let definition = gene_search_test().with_cleanup(Arc::new(Flaky));

        let verdict = runner(&["search_gene_by_name"])
            .run(&definition, &context(agent), &RunControl::new())
            .await;

        assert_eq!(verdict.status, TestStatus::Passed);
        assert!(verdict.warnings.iter().any(|w| w.contains("temp file")));
    }

    #[tokio::test]
    async fn test_hooks_run_on_every_path() {
        struct Counter(Arc<AtomicUsize>);
        #[async_trait]
        impl TestHook for Counter {
            async fn run(&self, _ctx: &TestContext) -> Result<(), HookError> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }

        let count = Arc::new(AtomicUsize::new(0));
        let agent = Arc::new(ScriptedAgent::new(vec![ScriptedTurn::failing("down")]));
        let definition = gene_search_test().with_cleanup(Arc::new(Counter(count.clone())));

        runner(&["search_gene_by_name"])
            .run(&definition, &context(agent), &RunControl::new())
            .await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
