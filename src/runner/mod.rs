//! Test execution: contexts, control flags, and the suite orchestrator.

pub mod context;
pub mod control;
pub mod single;
pub mod suite;

pub use context::{TestContext, TestHook};
pub use control::RunControl;
pub use single::TestRunner;
pub use suite::{BenchmarkRunner, RunResult, SuiteResult};
