//! Standardized metrics collection and reporting for CI.
//!
//! Worldtests export a [`MetricsReport`] as JSON so generation throughput,
//! portal behavior and snapshot sizes can be tracked across commits.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Top-level metrics report.
///
/// This is the standardized format for metrics.json files exported by tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsReport {
    /// Test/benchmark identifier
    pub test_name: String,

    /// Timestamp when metrics were collected (ISO 8601)
    pub timestamp: String,

    /// Git commit hash (if available)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_hash: Option<String>,

    /// Overall test result
    pub result: TestResult,

    /// World generation metrics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worldgen: Option<WorldgenMetrics>,

    /// Portal activation metrics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portals: Option<PortalMetrics>,

    /// Snapshot save/load metrics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistence: Option<PersistenceMetrics>,

    /// Test execution metrics
    pub test_execution: TestExecutionMetrics,
}

/// Overall test result status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestResult {
    /// Test passed all validations
    Pass,
    /// Test failed
    Fail,
    /// Test was skipped
    Skip,
}

/// World generation metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldgenMetrics {
    /// Regions processed
    pub regions: usize,

    /// Entrances requested across all regions
    pub dungeons_requested: usize,

    /// Entrances actually placed
    pub dungeons_placed: usize,

    /// Apex instances generated
    pub apex_count: usize,

    /// Candidate positions drawn
    pub placement_attempts: u64,

    /// Total generation time (milliseconds)
    pub total_gen_time_ms: f64,

    /// Instance count per dungeon type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by_type: Option<BTreeMap<String, usize>>,
}

/// Portal activation metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortalMetrics {
    /// Activations attempted
    pub activations: usize,

    /// Activations that moved or stamped a player
    pub transitions: usize,

    /// Activations rejected by the cooldown
    pub cooldown_hits: usize,

    /// Gate denials
    pub gate_denials: usize,

    /// Rewards claimed on descent
    pub rewards_claimed: usize,

    /// Average activation time (microseconds)
    pub avg_activation_time_us: f64,
}

/// Snapshot persistence metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistenceMetrics {
    /// Snapshots saved
    pub snapshots_saved: usize,

    /// Snapshots loaded
    pub snapshots_loaded: usize,

    /// Average save time (microseconds)
    pub avg_save_time_us: f64,

    /// Average load time (microseconds)
    pub avg_load_time_us: f64,

    /// Total bytes written
    pub bytes_written: u64,

    /// Compression ratio (JSON size over file size)
    pub compression_ratio: f64,
}

/// Test execution and infrastructure metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestExecutionMetrics {
    /// Total test duration (seconds)
    pub duration_seconds: f64,

    /// Number of assertions checked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assertions_checked: Option<usize>,

    /// Number of validations passed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validations_passed: Option<usize>,
}

/// Builder for constructing metrics reports
pub struct MetricsReportBuilder {
    report: MetricsReport,
}

impl MetricsReportBuilder {
    /// Create a new builder with test name
    pub fn new(test_name: impl Into<String>) -> Self {
        Self {
            report: MetricsReport {
                test_name: test_name.into(),
                timestamp: chrono::Utc::now().to_rfc3339(),
                commit_hash: None,
                result: TestResult::Pass,
                worldgen: None,
                portals: None,
                persistence: None,
                test_execution: TestExecutionMetrics::default(),
            },
        }
    }

    /// Set test result
    pub fn result(mut self, result: TestResult) -> Self {
        self.report.result = result;
        self
    }

    /// Set commit hash
    pub fn commit_hash(mut self, hash: impl Into<String>) -> Self {
        self.report.commit_hash = Some(hash.into());
        self
    }

    /// Set world generation metrics
    pub fn worldgen(mut self, metrics: WorldgenMetrics) -> Self {
        self.report.worldgen = Some(metrics);
        self
    }

    /// Set portal metrics
    pub fn portals(mut self, metrics: PortalMetrics) -> Self {
        self.report.portals = Some(metrics);
        self
    }

    /// Set persistence metrics
    pub fn persistence(mut self, metrics: PersistenceMetrics) -> Self {
        self.report.persistence = Some(metrics);
        self
    }

    /// Set test execution metrics
    pub fn execution(mut self, metrics: TestExecutionMetrics) -> Self {
        self.report.test_execution = metrics;
        self
    }

    /// Build the metrics report
    pub fn build(self) -> MetricsReport {
        self.report
    }
}

/// Sink for writing metrics reports to JSON files
pub struct MetricsSink {
    path: std::path::PathBuf,
}

impl MetricsSink {
    /// Create a new metrics sink at the specified path
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        Ok(Self { path })
    }

    /// Write metrics report to file
    pub fn write(&self, report: &MetricsReport) -> Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        let mut file = File::create(&self.path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
