//! Persists reports to disk.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::ReportError;
use crate::runner::suite::RunResult;

use super::{human, json, table};

/// Writes the three report renderings under one output directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Writes `<run_id>.json`, `<run_id>.csv`, and `<run_id>.txt`, creating
    /// the output directory if needed. Returns the written paths.
    pub fn write_all(&self, run: &RunResult) -> Result<Vec<PathBuf>, ReportError> {
        std::fs::create_dir_all(&self.output_dir)?;

        let mut written = Vec::with_capacity(3);
        written.push(self.write_file(&run.run_id, "json", &json::render(run)?)?);
        written.push(self.write_file(&run.run_id, "csv", &table::render(run))?);
        written.push(self.write_file(&run.run_id, "txt", &human::render(run))?);

        info!(run_id = %run.run_id, dir = %self.output_dir.display(), "Reports written");
        Ok(written)
    }

    fn write_file(&self, run_id: &str, ext: &str, contents: &str) -> Result<PathBuf, ReportError> {
        let path = self.output_dir.join(format!("{}.{}", run_id, ext));
        std::fs::write(&path, contents).map_err(|source| ReportError::Write {
            path: path.display().to_string(),
            source,
        })?;
        Ok(path)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::Utc;
    use tempfile::TempDir;

    use super::*;
    use crate::eval::Verdict;
    use crate::runner::suite::SuiteResult;
    use crate::stats::{overall_stats, suite_stats};
    use crate::suite::definition::Category;

    /// Small two-suite run shared by the report tests.
    pub(crate) fn sample_run() -> RunResult {
        let now = Utc::now();

        let mut passed = Verdict::scored("nav-001", 5, 5);
        passed.category = Category::Navigation;
        passed.metrics.response_time_ms = 120;

        let mut failed = Verdict::failed(
            "nav-002",
            5,
            "Expected tool 'navigate_to_position' but got 'compute_gc'",
        );
        failed.category = Category::Navigation;
        failed.metrics.response_time_ms = 80;

        let verdicts = vec![passed, failed];
        let stats = suite_stats(&verdicts);
        let suites = vec![SuiteResult {
            suite_id: "navigation".to_string(),
            started_at: now,
            finished_at: now,
            verdicts,
            stats,
        }];

        let overall = overall_stats(1, suites.iter().flat_map(|s| s.verdicts.iter()));
        RunResult {
            run_id: "20260828T101500.000Z".to_string(),
            started_at: now,
            finished_at: now,
            suites,
            overall,
        }
    }

    #[test]
    fn test_writes_three_files() {
        let temp = TempDir::new().unwrap();
        let writer = ReportWriter::new(temp.path().join("reports"));
        let run = sample_run();

        let written = writer.write_all(&run).unwrap();
        assert_eq!(written.len(), 3);
        for path in &written {
            assert!(path.exists(), "{} missing", path.display());
        }
        let names: Vec<String> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert!(names.contains(&format!("{}.json", run.run_id)));
        assert!(names.contains(&format!("{}.csv", run.run_id)));
        assert!(names.contains(&format!("{}.txt", run.run_id)));
    }

    #[test]
    fn test_json_file_parses_back() {
        let temp = TempDir::new().unwrap();
        let writer = ReportWriter::new(temp.path());
        let run = sample_run();

        writer.write_all(&run).unwrap();
        let contents =
            std::fs::read_to_string(temp.path().join(format!("{}.json", run.run_id))).unwrap();
        let parsed: RunResult = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed.run_id, run.run_id);
        assert_eq!(parsed.overall.summary.total, 2);
    }
}
