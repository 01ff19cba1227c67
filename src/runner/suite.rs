//! Suite and run orchestration.
//!
//! Drives selected suites through the single-test runner, emitting progress
//! events and aggregating statistics as it goes. Suites run strictly in
//! declared order and tests run sequentially; the agent holds one session at
//! a time.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::agent::AgentDriver;
use crate::config::ConfigProvider;
use crate::error::{ConfigError, ExtractError, RunError};
use crate::eval::{Evaluator, Verdict};
use crate::events::{EventSink, NullSink, RunEvent};
use crate::extract::ExtractorConfig;
use crate::stats::{overall_stats, suite_stats, OverallStats, SuiteStats};
use crate::suite::registry::{RunFilter, SuiteRegistry};

use super::context::TestContext;
use super::control::RunControl;
use super::single::TestRunner;

/// Outcome of one suite within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub suite_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub verdicts: Vec<Verdict>,
    pub stats: SuiteStats,
}

/// Outcome of one full benchmark run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Timestamp-derived identifier, unique per run.
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub suites: Vec<SuiteResult>,
    pub overall: OverallStats,
}

impl RunResult {
    /// All verdicts across suites, in execution order.
    pub fn verdicts(&self) -> impl Iterator<Item = &Verdict> {
        self.suites.iter().flat_map(|s| s.verdicts.iter())
    }
}

fn new_run_id(at: DateTime<Utc>) -> String {
    at.format("%Y%m%dT%H%M%S%.3fZ").to_string()
}

/// Runs registered suites against one agent.
pub struct BenchmarkRunner {
    registry: SuiteRegistry,
    agent: Arc<dyn AgentDriver>,
    config: Arc<dyn ConfigProvider>,
    events: Arc<dyn EventSink>,
    test_runner: TestRunner,
    control: RunControl,
}

impl BenchmarkRunner {
    /// Builds a runner. The extractor allow-list normally comes from
    /// [`crate::suite::catalog::known_tools`].
    pub fn new(
        registry: SuiteRegistry,
        agent: Arc<dyn AgentDriver>,
        config: Arc<dyn ConfigProvider>,
        extractor_config: &ExtractorConfig,
    ) -> Result<Self, ExtractError> {
        Self::with_evaluator(registry, agent, config, extractor_config, Evaluator::new())
    }

    /// Builds a runner with a pre-populated evaluator registry.
    pub fn with_evaluator(
        registry: SuiteRegistry,
        agent: Arc<dyn AgentDriver>,
        config: Arc<dyn ConfigProvider>,
        extractor_config: &ExtractorConfig,
        evaluator: Evaluator,
    ) -> Result<Self, ExtractError> {
        Ok(Self {
            registry,
            agent,
            config,
            events: Arc::new(NullSink),
            test_runner: TestRunner::new(extractor_config, evaluator)?,
            control: RunControl::new(),
        })
    }

    /// Replaces the event sink.
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Shared cancel/pause handle for this runner.
    pub fn control(&self) -> RunControl {
        self.control.clone()
    }

    /// Registered suites.
    pub fn registry(&self) -> &SuiteRegistry {
        &self.registry
    }

    /// Runs every selected test to a verdict.
    ///
    /// Fails before any test runs when the agent is unconfigured, the data
    /// directory is missing, or the filter names unknown ids. After that
    /// every selected test produces exactly one verdict, cancelled ones
    /// included.
    pub async fn run(&self, filter: &RunFilter) -> Result<RunResult, RunError> {
        if !self.agent.is_configured() {
            return Err(RunError::Config(ConfigError::AgentNotConfigured));
        }
        self.config.default_directory().map_err(RunError::Config)?;

        let selected = self.registry.select(filter)?;
        let started_at = Utc::now();
        let run_id = new_run_id(started_at);
        info!(run_id = %run_id, suites = selected.len(), "Starting benchmark run");

        let mut suites = Vec::with_capacity(selected.len());
        for (suite, tests) in &selected {
            suites.push(self.run_suite(&suite.id, tests).await);
        }

        let finished_at = Utc::now();
        let overall = overall_stats(
            suites.len(),
            suites.iter().flat_map(|s: &SuiteResult| s.verdicts.iter()),
        );
        self.events.on_event(&RunEvent::RunEnd {
            overall: overall.clone(),
        });
        info!(
            run_id = %run_id,
            passed = overall.summary.passed,
            total = overall.summary.total,
            "Benchmark run finished"
        );

        Ok(RunResult {
            run_id,
            started_at,
            finished_at,
            suites,
            overall,
        })
    }

    async fn run_suite(
        &self,
        suite_id: &str,
        tests: &[&crate::suite::definition::TestDefinition],
    ) -> SuiteResult {
        self.events.on_event(&RunEvent::SuiteStart {
            suite_id: suite_id.to_string(),
            test_count: tests.len(),
        });
        let started_at = Utc::now();

        let mut verdicts = Vec::with_capacity(tests.len());
        for (index, definition) in tests.iter().enumerate() {
            self.control.wait_if_paused().await;
            self.events.on_event(&RunEvent::TestProgress {
                suite_id: suite_id.to_string(),
                test_id: definition.id.clone(),
                index: index + 1,
                total: tests.len(),
            });

            let ctx = TestContext::new(
                definition.id.clone(),
                suite_id,
                self.agent.clone(),
                self.config.clone(),
                self.events.clone(),
            );
            // A cancelled run still yields a verdict per selected test; the
            // single-test runner short-circuits without dispatching.
            let verdict = self.test_runner.run(definition, &ctx, &self.control).await;
            self.events.on_event(&RunEvent::TestResult {
                verdict: verdict.clone(),
            });
            verdicts.push(verdict);
        }

        let stats = suite_stats(&verdicts);
        self.events.on_event(&RunEvent::SuiteEnd {
            suite_id: suite_id.to_string(),
            stats: stats.clone(),
        });

        SuiteResult {
            suite_id: suite_id.to_string(),
            started_at,
            finished_at: Utc::now(),
            verdicts,
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::mock::ScriptedTurn;
    use crate::agent::ScriptedAgent;
    use crate::config::BenchConfig;
    use crate::eval::TestStatus;
    use crate::events::CollectingSink;
    use crate::suite::definition::{ExpectedCall, Expectation, TestDefinition};
    use crate::suite::registry::Suite;
    use tempfile::TempDir;

    fn test_def(id: &str, tool: &str) -> TestDefinition {
        TestDefinition::new(
            id,
            "",
            format!("Run {}.", tool),
            Expectation::call(ExpectedCall::new(tool)),
            5,
        )
    }

    fn registry() -> SuiteRegistry {
        let mut registry = SuiteRegistry::new();
        registry
            .register(
                Suite::new("navigation", "Navigation")
                    .add_test(test_def("nav-001", "search_gene_by_name"))
                    .add_test(test_def("nav-002", "navigate_to_position")),
            )
            .unwrap();
        registry
    }

    fn success_turn(tool: &str) -> ScriptedTurn {
        ScriptedTurn::text(format!("Tool execution completed: {} succeeded", tool))
    }

    fn runner_with(
        agent: Arc<ScriptedAgent>,
        data_dir: &TempDir,
    ) -> BenchmarkRunner {
        BenchmarkRunner::new(
            registry(),
            agent,
            Arc::new(BenchConfig::with_data_dir(data_dir.path())),
            &ExtractorConfig::for_tools(vec!["search_gene_by_name", "navigate_to_position"]),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_run_produces_verdict_per_test() {
        let temp = TempDir::new().unwrap();
        let agent = Arc::new(ScriptedAgent::new(vec![
            success_turn("search_gene_by_name"),
            success_turn("navigate_to_position"),
        ]));
        let result = runner_with(agent, &temp)
            .run(&RunFilter::all())
            .await
            .unwrap();

        assert_eq!(result.suites.len(), 1);
        let ids: Vec<_> = result.verdicts().map(|v| v.test_id.clone()).collect();
        assert_eq!(ids, vec!["nav-001", "nav-002"]);
        assert_eq!(result.overall.summary.total, 2);
        assert_eq!(result.overall.summary.passed, 2);
    }

    #[tokio::test]
    async fn test_unconfigured_agent_fails_fast() {
        let temp = TempDir::new().unwrap();
        let agent = Arc::new(ScriptedAgent::unconfigured());
        let err = runner_with(agent.clone(), &temp)
            .run(&RunFilter::all())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RunError::Config(ConfigError::AgentNotConfigured)
        ));
        assert_eq!(agent.dispatch_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_data_dir_fails_fast() {
        let agent = Arc::new(ScriptedAgent::new(vec![]));
        let runner = BenchmarkRunner::new(
            registry(),
            agent.clone(),
            Arc::new(BenchConfig::default()),
            &ExtractorConfig::for_tools(vec!["search_gene_by_name"]),
        )
        .unwrap();

        let err = runner.run(&RunFilter::all()).await.unwrap_err();
        assert!(matches!(err, RunError::Config(_)));
        assert_eq!(agent.dispatch_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_filter_fails_before_dispatch() {
        let temp = TempDir::new().unwrap();
        let agent = Arc::new(ScriptedAgent::new(vec![]));
        let err = runner_with(agent.clone(), &temp)
            .run(&RunFilter::suites(vec!["nonexistent"]))
            .await
            .unwrap_err();

        assert!(matches!(err, RunError::Registry(_)));
        assert_eq!(agent.dispatch_count(), 0);
    }

    #[tokio::test]
    async fn test_event_ordering() {
        let temp = TempDir::new().unwrap();
        let agent = Arc::new(ScriptedAgent::new(vec![
            success_turn("search_gene_by_name"),
            success_turn("navigate_to_position"),
        ]));
        let sink = Arc::new(CollectingSink::new());
        let runner = runner_with(agent, &temp).with_events(sink.clone());
        runner.run(&RunFilter::all()).await.unwrap();

        let kinds: Vec<&'static str> = sink
            .events()
            .iter()
            .map(|e| match e {
                RunEvent::SuiteStart { .. } => "suite_start",
                RunEvent::TestProgress { .. } => "test_progress",
                RunEvent::TestResult { .. } => "test_result",
                RunEvent::SuiteEnd { .. } => "suite_end",
                RunEvent::RunEnd { .. } => "run_end",
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                "suite_start",
                "test_progress",
                "test_result",
                "test_progress",
                "test_result",
                "suite_end",
                "run_end"
            ]
        );
    }

    #[tokio::test]
    async fn test_cancel_short_circuits_remaining_tests() {
        let temp = TempDir::new().unwrap();
        let agent = Arc::new(ScriptedAgent::new(vec![
            success_turn("search_gene_by_name"),
            success_turn("navigate_to_position"),
        ]));

        struct CancelAfterFirst {
            control: RunControl,
        }
        impl crate::events::EventSink for CancelAfterFirst {
            fn on_event(&self, event: &RunEvent) {
                if matches!(event, RunEvent::TestResult { .. }) {
                    self.control.cancel();
                }
            }
        }

        let runner = runner_with(agent.clone(), &temp);
        let control = runner.control();
        let runner = runner.with_events(Arc::new(CancelAfterFirst { control }));
        let result = runner.run(&RunFilter::all()).await.unwrap();

        // Second test still yields a verdict, but no instruction went out.
        assert_eq!(result.overall.summary.total, 2);
        assert_eq!(result.overall.summary.cancelled, 1);
        assert_eq!(agent.dispatch_count(), 1);
        let statuses: Vec<_> = result.verdicts().map(|v| v.status).collect();
        assert_eq!(statuses, vec![TestStatus::Passed, TestStatus::Cancelled]);
    }
}
