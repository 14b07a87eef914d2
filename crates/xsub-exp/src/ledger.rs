use std::fs::{self, OpenOptions};
use std::io::BufWriter;
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use xsub_core::errors::{ErrorInfo, XsubError};

use crate::report::SubmissionReport;

const COLUMNS: [&str; 11] = [
    "created_at",
    "analysis_version",
    "execution_version",
    "container_id",
    "catalog_hash",
    "job",
    "config",
    "models",
    "status",
    "attempts",
    "diagnostic",
];

/// Rows read back from a ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

fn wrap_csv(code: &str, err: csv::Error) -> XsubError {
    XsubError::Io(ErrorInfo::new(code, err.to_string()))
}

/// Appends one row per submission result, writing the header for new files.
pub fn ledger_append(path: &Path, report: &SubmissionReport) -> Result<(), XsubError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| XsubError::io("ledger_dir", err))?;
    }
    let needs_header = fs::metadata(path).map(|meta| meta.len() == 0).unwrap_or(true);
    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .map_err(|err| {
            XsubError::Io(
                ErrorInfo::new("ledger_open", "failed to open ledger")
                    .with_context("path", path.display().to_string())
                    .with_hint(err.to_string()),
            )
        })?;
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_writer(BufWriter::new(file));
    if needs_header {
        writer
            .write_record(COLUMNS)
            .map_err(|err| wrap_csv("ledger_write_header", err))?;
    }
    let context = &report.context;
    for result in &report.results {
        let status = if result.succeeded() { "success" } else { "failure" };
        let record = [
            report.created_at.clone(),
            context.analysis_version().to_string(),
            context.execution_version().to_string(),
            context.container_id().to_string(),
            report.catalog_hash.clone(),
            result.index.to_string(),
            result.job.analysis_config_path().to_string(),
            result.job.model_ids().join(" "),
            status.to_string(),
            result.attempts.to_string(),
            result.diagnostic.clone().unwrap_or_default(),
        ];
        writer
            .write_record(&record)
            .map_err(|err| wrap_csv("ledger_write_row", err))?;
    }
    writer
        .flush()
        .map_err(|err| XsubError::io("ledger_flush", err))?;
    Ok(())
}

/// Reads a ledger, optionally keeping only rows of one analysis version.
pub fn ledger_read(path: &Path, analysis_version: Option<&str>) -> Result<Table, XsubError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|err| wrap_csv("ledger_read", err))?;
    let columns = reader
        .headers()
        .map_err(|err| wrap_csv("ledger_headers", err))?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| wrap_csv("ledger_row", err))?;
        if let Some(version) = analysis_version {
            if record.get(1) != Some(version) {
                continue;
            }
        }
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(Table { columns, rows })
}
