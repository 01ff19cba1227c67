//! Progress and result events emitted to the presentation sink.
//!
//! The harness never talks to a UI directly; runners emit [`RunEvent`]s and
//! whatever is listening (a TUI, a log, a test) consumes them through the
//! [`EventSink`] trait.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::eval::Verdict;
use crate::stats::{OverallStats, SuiteStats};

/// Named events with stable payload shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    SuiteStart {
        suite_id: String,
        test_count: usize,
    },
    TestProgress {
        suite_id: String,
        test_id: String,
        index: usize,
        total: usize,
    },
    TestResult {
        verdict: Verdict,
    },
    SuiteEnd {
        suite_id: String,
        stats: SuiteStats,
    },
    RunEnd {
        overall: OverallStats,
    },
}

/// Consumer of progress and result events.
pub trait EventSink: Send + Sync {
    fn on_event(&self, event: &RunEvent);
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn on_event(&self, _event: &RunEvent) {}
}

/// Fans one event stream out to several sinks.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl EventSink for FanoutSink {
    fn on_event(&self, event: &RunEvent) {
        for sink in &self.sinks {
            sink.on_event(event);
        }
    }
}

/// Sink that logs progress through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn on_event(&self, event: &RunEvent) {
        match event {
            RunEvent::SuiteStart {
                suite_id,
                test_count,
            } => info!(suite_id = %suite_id, test_count, "Suite started"),
            RunEvent::TestProgress {
                suite_id,
                test_id,
                index,
                total,
            } => info!(suite_id = %suite_id, test_id = %test_id, index, total, "Running test"),
            RunEvent::TestResult { verdict } => info!(
                test_id = %verdict.test_id,
                status = %verdict.status,
                score = verdict.score,
                max_score = verdict.max_score,
                "Test finished"
            ),
            RunEvent::SuiteEnd { suite_id, stats } => info!(
                suite_id = %suite_id,
                passed = stats.summary.passed,
                total = stats.summary.total,
                "Suite finished"
            ),
            RunEvent::RunEnd { overall } => info!(
                suites = overall.suites,
                passed = overall.summary.passed,
                total = overall.summary.total,
                "Run finished"
            ),
        }
    }
}

/// Sink that records events in memory, used by tests.
#[derive(Default)]
pub struct CollectingSink {
    events: Mutex<Vec<RunEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events seen so far.
    pub fn events(&self) -> Vec<RunEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl EventSink for CollectingSink {
    fn on_event(&self, event: &RunEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
    }
}
