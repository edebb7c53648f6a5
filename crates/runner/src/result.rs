//! Run outcomes: per-case results, per-file suites and whole-run reports

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::RunnerResult;

/// Case name of the single result a flow test produces
pub const FLOW_CASE_NAME: &str = "flow";

/// Case name used when a screen test's setup fails
pub const SETUP_CASE_NAME: &str = "setup";

/// File written by [`write_results`]
pub const RESULTS_FILE: &str = "test-results.json";

/// Outcome of one screen test case, or of one whole flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub test_name: String,
    pub case_name: String,
    pub passed: bool,

    /// Set for cases that were skipped; they still count as passed
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub duration_ms: u64,
}

impl TestResult {
    pub fn passed(test_name: &str, case_name: &str, duration_ms: u64) -> Self {
        Self {
            test_name: test_name.to_string(),
            case_name: case_name.to_string(),
            passed: true,
            skipped: false,
            error: None,
            duration_ms,
        }
    }

    pub fn failed(test_name: &str, case_name: &str, error: String, duration_ms: u64) -> Self {
        Self {
            passed: false,
            error: Some(error),
            ..Self::passed(test_name, case_name, duration_ms)
        }
    }

    pub fn skipped(test_name: &str, case_name: &str) -> Self {
        Self {
            skipped: true,
            ..Self::passed(test_name, case_name, 0)
        }
    }
}

/// Results of one loaded test file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSuiteResult {
    pub suite_name: String,
    pub results: Vec<TestResult>,
    pub total_duration_ms: u64,
}

impl TestSuiteResult {
    /// Suite for a test filtered out by platform
    pub fn empty(suite_name: &str) -> Self {
        Self {
            suite_name: suite_name.to_string(),
            results: Vec::new(),
            total_duration_ms: 0,
        }
    }

    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.passed).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.results.iter().filter(|r| r.skipped).count()
    }

    pub fn all_passed(&self) -> bool {
        self.failed_count() == 0
    }
}

/// Every suite of one run, in execution order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub suites: Vec<TestSuiteResult>,
    pub total_duration_ms: u64,
}

impl RunReport {
    pub fn total(&self) -> usize {
        self.suites.iter().map(|s| s.results.len()).sum()
    }

    pub fn passed(&self) -> usize {
        self.suites.iter().map(TestSuiteResult::passed_count).sum()
    }

    pub fn failed(&self) -> usize {
        self.suites.iter().map(TestSuiteResult::failed_count).sum()
    }

    pub fn skipped(&self) -> usize {
        self.suites.iter().map(TestSuiteResult::skipped_count).sum()
    }

    pub fn all_passed(&self) -> bool {
        self.suites.iter().all(TestSuiteResult::all_passed)
    }

    /// Every failed result, across suites
    pub fn failures(&self) -> impl Iterator<Item = &TestResult> {
        self.suites
            .iter()
            .flat_map(|s| s.results.iter())
            .filter(|r| !r.passed)
    }
}

/// Write `report` as pretty JSON into `dir`, returning the file path
pub fn write_results(dir: &Path, report: &RunReport) -> RunnerResult<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let path = dir.join(RESULTS_FILE);
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(&path, json)?;

    info!("Results written to: {}", path.display());
    Ok(path)
}
