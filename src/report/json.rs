//! Canonical JSON report.
//!
//! Field order is fixed by the struct definitions and category maps are
//! `BTreeMap`s, so two identical runs serialize byte-identically.

use crate::error::ReportError;
use crate::runner::suite::RunResult;

/// Renders the full run as pretty-printed JSON.
pub fn render(run: &RunResult) -> Result<String, ReportError> {
    Ok(serde_json::to_string_pretty(run)?)
}
