use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use xsub_core::errors::{ErrorInfo, XsubError};
use xsub_core::{from_yaml_slice, stable_hash_string, to_canonical_json_bytes, JobSpec};

const CATALOG_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// Values applied to every job that does not set them itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct CatalogDefaults {
    #[serde(default)]
    pub hyperparameters: BTreeMap<String, Value>,
}

/// Static list of jobs making up one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Catalog {
    /// Batch the catalog was written for; checked against the requested id when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch: Option<String>,
    #[serde(default)]
    pub defaults: CatalogDefaults,
    pub jobs: Vec<JobSpec>,
}

impl Catalog {
    /// Catalog holding `jobs` without defaults.
    pub fn from_jobs(jobs: Vec<JobSpec>) -> Self {
        Self {
            batch: None,
            defaults: CatalogDefaults::default(),
            jobs,
        }
    }

    /// Jobs with catalog defaults merged in, in catalog order.
    pub fn resolved_jobs(&self) -> Vec<JobSpec> {
        self.jobs
            .iter()
            .cloned()
            .map(|job| job.merged_with_defaults(&self.defaults.hyperparameters))
            .collect()
    }

    /// Rejects empty catalogs, invalid jobs and repeated job definitions.
    pub fn validate(&self) -> Result<(), XsubError> {
        if self.jobs.is_empty() {
            return Err(XsubError::catalog("catalog_empty", "catalog defines no jobs"));
        }
        let mut seen = BTreeSet::new();
        for (idx, job) in self.resolved_jobs().iter().enumerate() {
            job.validate().map_err(|err| with_job_index(err, idx))?;
            let bytes = to_canonical_json_bytes(job)?;
            if !seen.insert(bytes) {
                return Err(XsubError::Catalog(
                    ErrorInfo::new("catalog_duplicate_job", "job defined more than once")
                        .with_context("job", idx.to_string())
                        .with_context("config", job.analysis_config_path()),
                ));
            }
        }
        Ok(())
    }

    /// Stable fingerprint of the resolved jobs.
    pub fn catalog_hash(&self) -> Result<String, XsubError> {
        stable_hash_string(&self.resolved_jobs())
    }

    /// Confirms the catalog may be submitted under `batch_id`.
    pub fn check_batch(&self, batch_id: &str) -> Result<(), XsubError> {
        match &self.batch {
            Some(declared) if declared != batch_id => Err(XsubError::Catalog(
                ErrorInfo::new("catalog_batch_mismatch", "catalog belongs to another batch")
                    .with_context("declared", declared.clone())
                    .with_context("requested", batch_id),
            )),
            _ => Ok(()),
        }
    }
}

fn with_job_index(err: XsubError, idx: usize) -> XsubError {
    err.with_context("job", idx.to_string())
}

/// Loads and validates a catalog file.
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<Catalog, XsubError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|err| {
        XsubError::Catalog(
            ErrorInfo::new("catalog_read", "failed to read catalog")
                .with_context("path", path.display().to_string())
                .with_hint(err.to_string()),
        )
    })?;
    let catalog: Catalog = from_yaml_slice(&bytes).map_err(|err| {
        XsubError::Catalog(
            ErrorInfo::new("catalog_parse", err.info().message.clone())
                .with_context("path", path.display().to_string()),
        )
    })?;
    catalog
        .validate()
        .map_err(|err| err.with_context("path", path.display().to_string()))?;
    Ok(catalog)
}

/// Directory of catalogs named after their batch id (`<batch>.yaml`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogStore {
    root: PathBuf,
}

impl CatalogStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the catalog for `batch_id`.
    pub fn resolve(&self, batch_id: &str) -> Result<PathBuf, XsubError> {
        if batch_id.is_empty()
            || batch_id.starts_with('.')
            || batch_id.contains(['/', '\\'])
        {
            return Err(XsubError::Catalog(
                ErrorInfo::new("catalog_batch_id", "batch id cannot be used as a file name")
                    .with_context("batch", batch_id),
            ));
        }
        for ext in CATALOG_EXTENSIONS {
            let candidate = self.root.join(format!("{batch_id}.{ext}"));
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
        let known = self.batches().unwrap_or_default();
        let mut info = ErrorInfo::new("catalog_not_found", "no catalog for batch")
            .with_context("batch", batch_id)
            .with_context("root", self.root.display().to_string());
        if !known.is_empty() {
            info = info.with_hint(format!("known batches: {}", known.join(", ")));
        }
        Err(XsubError::Catalog(info))
    }

    /// Loads the catalog for `batch_id` and checks its declared batch.
    pub fn load(&self, batch_id: &str) -> Result<Catalog, XsubError> {
        let path = self.resolve(batch_id)?;
        let catalog = load_catalog(&path)?;
        catalog.check_batch(batch_id)?;
        Ok(catalog)
    }

    /// Batch ids with a catalog in the store, sorted.
    pub fn batches(&self) -> Result<Vec<String>, XsubError> {
        let entries = fs::read_dir(&self.root).map_err(|err| {
            XsubError::Catalog(
                ErrorInfo::new("catalog_store_read", "failed to list catalog directory")
                    .with_context("root", self.root.display().to_string())
                    .with_hint(err.to_string()),
            )
        })?;
        let mut batches: Vec<String> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| CATALOG_EXTENSIONS.contains(&ext))
                    .unwrap_or(false)
            })
            .filter_map(|path| path.file_stem().map(|stem| stem.to_string_lossy().into_owned()))
            .collect();
        batches.sort();
        batches.dedup();
        Ok(batches)
    }
}
