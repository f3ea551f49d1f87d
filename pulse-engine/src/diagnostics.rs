//! Bug reports for failed regression checks.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use serde::Serialize;

use pulse_config::CountingStrategy;

use crate::error::EngineError;

/// Everything needed to reproduce a sweep whose hash did not match.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HashMismatchReport {
    pub data_path: Option<PathBuf>,
    pub replay_date: NaiveDate,
    pub baseline_offset: u64,
    pub step_seconds: u64,
    pub strategy: CountingStrategy,
    pub ticks: u64,
    pub expected: String,
    pub actual: String,
}

#[derive(Debug)]
pub struct DiagnosticsCollector {
    report_dir: PathBuf,
    bug_reports: Vec<PathBuf>,
}

impl Default for DiagnosticsCollector {
    fn default() -> Self {
        Self::new(".")
    }
}

impl DiagnosticsCollector {
    pub fn new(report_dir: impl Into<PathBuf>) -> Self {
        Self {
            report_dir: report_dir.into(),
            bug_reports: Vec::new(),
        }
    }

    pub fn report_dir(&self) -> &Path {
        &self.report_dir
    }

    /// Writes `report` as YAML to `bug_report_<utc timestamp>.yaml`.
    pub fn record_bug_report<T: Serialize>(&mut self, report: &T) -> Result<PathBuf, EngineError> {
        let yaml = serde_yaml::to_string(report)?;
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3f");
        let path = self.report_dir.join(format!("bug_report_{stamp}.yaml"));
        fs::write(&path, yaml)?;

        self.bug_reports.push(path.clone());
        Ok(path)
    }

    pub fn bug_reports(&self) -> &[PathBuf] {
        &self.bug_reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_is_written_as_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let mut diagnostics = DiagnosticsCollector::new(dir.path());
        let report = HashMismatchReport {
            data_path: None,
            replay_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            baseline_offset: 10,
            step_seconds: 1,
            strategy: CountingStrategy::Cursor,
            ticks: 601,
            expected: "00".into(),
            actual: "ff".into(),
        };

        let path = diagnostics.record_bug_report(&report).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("replay_date:"));
        assert!(written.contains("2024-03-01"));
        assert!(written.contains("strategy: cursor"));
        assert_eq!(diagnostics.bug_reports(), &[path]);
    }
}
