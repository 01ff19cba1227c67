//! Human-readable text report.

use std::fmt::Write as _;

use crate::runner::suite::RunResult;

/// Renders a text summary: one section per suite plus an overall footer.
pub fn render(run: &RunResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Benchmark run {}", run.run_id);
    let _ = writeln!(
        out,
        "Started {}  finished {}",
        run.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
        run.finished_at.format("%Y-%m-%d %H:%M:%S UTC"),
    );
    let _ = writeln!(out);

    for suite in &run.suites {
        let summary = &suite.stats.summary;
        let _ = writeln!(
            out,
            "== {} ({}/{} passed, {:.1}%)",
            suite.suite_id,
            summary.passed,
            summary.total,
            summary.pass_rate(),
        );
        for verdict in &suite.verdicts {
            let _ = writeln!(
                out,
                "  [{:>9}] {:<12} {}/{} in {} ms",
                verdict.status.to_string(),
                verdict.test_id,
                verdict.score,
                verdict.max_score,
                verdict.metrics.response_time_ms,
            );
            for error in &verdict.errors {
                let _ = writeln!(out, "      error: {}", error);
            }
            for warning in &verdict.warnings {
                let _ = writeln!(out, "      warning: {}", warning);
            }
        }
        let _ = writeln!(out);
    }

    let overall = &run.overall.summary;
    let _ = writeln!(
        out,
        "Overall: {}/{} passed ({:.1}%), {} errors, {} cancelled",
        overall.passed,
        overall.total,
        overall.pass_rate(),
        overall.errors,
        overall.cancelled,
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::writer::tests::sample_run;

    #[test]
    fn test_sections_per_suite() {
        let run = sample_run();
        let text = render(&run);
        assert!(text.contains("== navigation"));
        assert!(text.contains("nav-001"));
        assert!(text.starts_with(&format!("Benchmark run {}", run.run_id)));
    }

    #[test]
    fn test_errors_and_warnings_listed() {
        let run = sample_run();
        let text = render(&run);
        assert!(text.contains("error: Expected tool"));
        assert!(text.contains("Overall:"));
    }
}
