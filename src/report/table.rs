//! CSV report, one row per verdict.

use std::fmt::Write as _;

use crate::runner::suite::RunResult;

const HEADER: &str =
    "run_id,suite_id,test_id,status,score,max_score,duration_ms,errors_count,warnings_count";

/// Renders the run as CSV with a fixed header row.
pub fn render(run: &RunResult) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');
    for suite in &run.suites {
        for verdict in &suite.verdicts {
            let _ = writeln!(
                out,
                "{},{},{},{},{},{},{},{},{}",
                escape(&run.run_id),
                escape(&suite.suite_id),
                escape(&verdict.test_id),
                verdict.status,
                verdict.score,
                verdict.max_score,
                verdict.metrics.response_time_ms,
                verdict.errors.len(),
                verdict.warnings.len(),
            );
        }
    }
    out
}

/// Quotes a field when it contains a comma, quote, or newline.
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
