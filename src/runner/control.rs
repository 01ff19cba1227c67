//! Cooperative cancel and pause flags shared between a run and its owner.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Poll interval while paused.
const PAUSE_POLL: Duration = Duration::from_millis(100);

/// Shared control handle for one run.
///
/// The runner checks these flags between tests; an instruction already
/// dispatched to the agent is never interrupted by them.
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    cancelled: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent; cannot be undone.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Pauses the run at the next test boundary.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    /// Resumes a paused run.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Blocks while paused; returns early when cancelled so a paused run can
    /// still be torn down.
    pub async fn wait_if_paused(&self) {
        while self.is_paused() && !self.is_cancelled() {
            tokio::time::sleep(PAUSE_POLL).await;
        }
    }
}
