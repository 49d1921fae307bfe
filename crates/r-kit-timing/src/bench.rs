//! ---
//! ems_section: "06-performance-realtime"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Timed invocation and repeat-run benchmarking."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fmt::Display;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use r_kit_common::time::duration_to_nanos_f64;
use serde::Serialize;
use tracing::info;

use crate::errors::Result;
use crate::invoke::time_call;

/// Elapsed times of successful runs, in run order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimingSamples {
    samples: Vec<Duration>,
}

impl TimingSamples {
    pub fn push(&mut self, elapsed: Duration) {
        self.samples.push(elapsed);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Wall-clock time spent inside the work across all samples.
    pub fn total(&self) -> Duration {
        self.samples.iter().sum()
    }

    /// Order statistics over the samples; `None` when nothing succeeded.
    pub fn summary(&self) -> Option<TimingSummary> {
        if self.samples.is_empty() {
            return None;
        }
        let mut sorted = self.samples.clone();
        sorted.sort_unstable();
        let nanos: Vec<f64> = sorted.iter().copied().map(duration_to_nanos_f64).collect();

        let count = nanos.len();
        let mean = nanos.iter().sum::<f64>() / count as f64;
        let std_dev = if count > 1 {
            let squares: f64 = nanos.iter().map(|n| (n - mean).powi(2)).sum();
            (squares / (count - 1) as f64).sqrt()
        } else {
            0.0
        };
        let median = if count % 2 == 0 {
            (nanos[count / 2 - 1] + nanos[count / 2]) / 2.0
        } else {
            nanos[count / 2]
        };
        // nearest-rank percentile
        let p95_rank = ((count as f64) * 0.95).ceil() as usize;

        Some(TimingSummary {
            samples: count as u64,
            total_ns: duration_to_nanos_f64(self.total()),
            mean_ns: mean,
            median_ns: median,
            p95_ns: nanos[p95_rank.clamp(1, count) - 1],
            std_dev_ns: std_dev,
            min_ns: nanos[0],
            max_ns: nanos[count - 1],
        })
    }
}

/// Summary of successful runs, all figures in nanoseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimingSummary {
    pub samples: u64,
    pub total_ns: f64,
    pub mean_ns: f64,
    pub median_ns: f64,
    pub p95_ns: f64,
    pub std_dev_ns: f64,
    pub min_ns: f64,
    pub max_ns: f64,
}

/// Result of repeating a unit of work. Failed runs are counted, not sampled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkReport {
    pub iterations: u32,
    pub failures: u32,
    pub last_error: Option<String>,
    pub summary: Option<TimingSummary>,
}

impl BenchmarkReport {
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut file = File::create(path)?;
        let json = serde_json::to_vec_pretty(self)?;
        file.write_all(&json)?;
        Ok(())
    }
}

/// Run `work` `iterations` times, timing each call.
pub fn bench<T, E, F>(iterations: u32, mut work: F) -> BenchmarkReport
where
    E: Display,
    F: FnMut() -> std::result::Result<T, E>,
{
    let mut samples = TimingSamples::default();
    let mut failures = 0;
    let mut last_error = None;
    for _ in 0..iterations {
        let result = time_call(&mut work);
        match (result.elapsed, result.error_message) {
            (Some(elapsed), None) => samples.push(elapsed),
            (_, message) => {
                failures += 1;
                last_error = message;
            }
        }
    }
    let summary = samples.summary();
    info!(
        iterations,
        failures,
        median_ns = summary.as_ref().map(|s| s.median_ns),
        "benchmark finished"
    );
    BenchmarkReport {
        iterations,
        failures,
        last_error,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn samples_of(millis: &[u64]) -> TimingSamples {
        let mut samples = TimingSamples::default();
        for ms in millis {
            samples.push(Duration::from_millis(*ms));
        }
        samples
    }

    #[test]
    fn summary_statistics() {
        assert!(TimingSamples::default().summary().is_none());
        let samples = samples_of(&[3, 1, 2]);
        assert_eq!(samples.total(), Duration::from_millis(6));
        let summary = samples.summary().unwrap();
        assert_eq!(summary.samples, 3);
        assert!((summary.total_ns - 6_000_000.0).abs() < 1.0);
        assert!((summary.mean_ns - 2_000_000.0).abs() < 1.0);
        assert!((summary.median_ns - 2_000_000.0).abs() < 1.0);
        assert!((summary.std_dev_ns - 1_000_000.0).abs() < 1.0);
        assert!((summary.min_ns - 1_000_000.0).abs() < 1.0);
        assert!((summary.max_ns - 3_000_000.0).abs() < 1.0);
    }

    #[test]
    fn median_and_tail_ignore_outlier_order() {
        let summary = samples_of(&[40, 10, 20, 30]).summary().unwrap();
        assert!((summary.median_ns - 25_000_000.0).abs() < 1.0);
        assert!((summary.p95_ns - 40_000_000.0).abs() < 1.0);

        let mut many: Vec<u64> = (1..=20).collect();
        many.reverse();
        let summary = samples_of(&many).summary().unwrap();
        assert!((summary.p95_ns - 19_000_000.0).abs() < 1.0);

        let single = samples_of(&[7]).summary().unwrap();
        assert_eq!(single.std_dev_ns, 0.0);
        assert_eq!(single.p95_ns, single.median_ns);
    }

    #[test]
    fn bench_counts_failures_separately() {
        let mut calls = 0;
        let report = bench(5, || {
            calls += 1;
            if calls % 2 == 0 {
                Err(format!("run {calls} failed"))
            } else {
                Ok(calls)
            }
        });
        assert_eq!(report.iterations, 5);
        assert_eq!(report.failures, 2);
        assert_eq!(report.last_error.as_deref(), Some("run 4 failed"));
        assert_eq!(report.summary.unwrap().samples, 3);
    }

    #[test]
    fn report_persists_as_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bench.json");
        let report = bench(2, || Ok::<_, String>(()));
        report.write_json(&path).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["iterations"], 2);
        assert_eq!(value["summary"]["samples"], 2);
    }
}
