//! Statistics aggregation over verdicts.
//!
//! All aggregations accumulate in integers before any floating-point math,
//! so every permutation of the same verdicts produces byte-identical output.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::eval::{TestStatus, Verdict};

/// Score distribution over a set of verdicts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreStats {
    pub min: u32,
    pub max: u32,
    pub mean: f64,
    pub std_dev: f64,
}

/// Response-time distribution over a set of verdicts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub mean_ms: f64,
    pub p50_ms: u64,
    pub p95_ms: u64,
}

/// Counts plus score and latency distributions for one verdict group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerdictStats {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub cancelled: usize,
    pub score: ScoreStats,
    pub latency: LatencyStats,
}

impl VerdictStats {
    /// Pass rate in percent.
    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passed as f64 * 100.0 / self.total as f64
        }
    }
}

/// Suite-level aggregation: the summary plus a per-category breakdown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuiteStats {
    pub summary: VerdictStats,
    pub by_category: BTreeMap<String, VerdictStats>,
}

/// Run-level aggregation across all suites.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverallStats {
    pub suites: usize,
    pub summary: VerdictStats,
    pub by_category: BTreeMap<String, VerdictStats>,
}

/// Aggregates one suite's verdicts.
pub fn suite_stats(verdicts: &[Verdict]) -> SuiteStats {
    SuiteStats {
        summary: aggregate(verdicts.iter()),
        by_category: category_breakdown(verdicts.iter()),
    }
}

/// Aggregates verdicts across suites.
pub fn overall_stats<'a, I>(suites: usize, verdicts: I) -> OverallStats
where
    I: IntoIterator<Item = &'a Verdict>,
{
    let all: Vec<&Verdict> = verdicts.into_iter().collect();
    OverallStats {
        suites,
        summary: aggregate(all.iter().copied()),
        by_category: category_breakdown(all.iter().copied()),
    }
}

fn category_breakdown<'a, I>(verdicts: I) -> BTreeMap<String, VerdictStats>
where
    I: Iterator<Item = &'a Verdict>,
{
    let mut groups: BTreeMap<String, Vec<&Verdict>> = BTreeMap::new();
    for verdict in verdicts {
        groups
            .entry(verdict.category.to_string())
            .or_default()
            .push(verdict);
    }
    groups
        .into_iter()
        .map(|(category, group)| (category, aggregate(group.into_iter())))
        .collect()
}

fn aggregate<'a, I>(verdicts: I) -> VerdictStats
where
    I: Iterator<Item = &'a Verdict>,
{
    let mut stats = VerdictStats::default();
    let mut scores: Vec<u32> = Vec::new();
    let mut latencies: Vec<u64> = Vec::new();

    for verdict in verdicts {
        stats.total += 1;
        match verdict.status {
            TestStatus::Passed => stats.passed += 1,
            TestStatus::Failed => stats.failed += 1,
            TestStatus::Error => stats.errors += 1,
            TestStatus::Cancelled => stats.cancelled += 1,
        }
        scores.push(verdict.score);
        latencies.push(verdict.metrics.response_time_ms);
    }

    if stats.total == 0 {
        return stats;
    }

    scores.sort_unstable();
    latencies.sort_unstable();

    // Integer sums keep the result independent of input order.
    let n = scores.len() as u64;
    let score_sum: u64 = scores.iter().map(|&s| s as u64).sum();
    let score_sq_sum: u64 = scores.iter().map(|&s| (s as u64) * (s as u64)).sum();
    let mean = score_sum as f64 / n as f64;
    let variance = (score_sq_sum as f64 / n as f64 - mean * mean).max(0.0);

    stats.score = ScoreStats {
        min: scores[0],
        max: scores[scores.len() - 1],
        mean,
        std_dev: variance.sqrt(),
    };

    let latency_sum: u64 = latencies.iter().sum();
    stats.latency = LatencyStats {
        mean_ms: latency_sum as f64 / n as f64,
        p50_ms: percentile(&latencies, 50),
        p95_ms: percentile(&latencies, 95),
    };

    stats
}

/// Nearest-rank percentile over a sorted slice.
fn percentile(sorted: &[u64], p: u32) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let rank = (p as usize * sorted.len()).div_ceil(100).max(1);
    sorted[rank - 1]
}
