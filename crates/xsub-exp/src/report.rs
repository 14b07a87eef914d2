use std::fs;
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use xsub_core::errors::XsubError;
use xsub_core::{from_json_slice, to_canonical_json_pretty, ExecutionContext, SubmissionResult};

/// Outcome counts for a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ReportSummary {
    /// Jobs dispatched.
    pub total: usize,
    /// Jobs the backend accepted.
    pub succeeded: usize,
    /// Jobs that failed after all attempts.
    pub failed: usize,
}

impl ReportSummary {
    /// Counts outcomes over `results`.
    pub fn from_results(results: &[SubmissionResult]) -> Self {
        let succeeded = results.iter().filter(|result| result.succeeded()).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
        }
    }
}

/// Bookkeeping for one orchestrator run, one entry per catalog job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionReport {
    pub context: ExecutionContext,
    /// Stable hash of the validated catalog.
    pub catalog_hash: String,
    /// UTC creation time, RFC 3339 with second precision.
    pub created_at: String,
    pub summary: ReportSummary,
    pub results: Vec<SubmissionResult>,
}

impl SubmissionReport {
    /// Report stamped with the current time and summarised from `results`.
    pub fn new(
        context: ExecutionContext,
        catalog_hash: String,
        results: Vec<SubmissionResult>,
    ) -> Self {
        Self {
            context,
            catalog_hash,
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            summary: ReportSummary::from_results(&results),
            results,
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.summary.failed == 0
    }

    /// Failed results in catalog order.
    pub fn failures(&self) -> impl Iterator<Item = &SubmissionResult> {
        self.results.iter().filter(|result| !result.succeeded())
    }

    /// Writes the report as indented canonical JSON, creating parent directories.
    pub fn write(&self, path: &Path) -> Result<(), XsubError> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| XsubError::io("report_dir", err))?;
        }
        let bytes = to_canonical_json_pretty(self)?;
        fs::write(path, bytes).map_err(|err| XsubError::io("report_write", err))
    }

    /// Reads a report previously written by [`SubmissionReport::write`].
    pub fn read(path: &Path) -> Result<Self, XsubError> {
        let bytes = fs::read(path).map_err(|err| XsubError::io("report_read", err))?;
        from_json_slice(&bytes)
    }
}
