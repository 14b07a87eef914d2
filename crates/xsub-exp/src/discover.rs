use std::collections::BTreeMap;
use std::path::PathBuf;

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde_json::Value;
use walkdir::WalkDir;
use xsub_core::errors::{ErrorInfo, XsubError};
use xsub_core::JobSpec;

use crate::catalog::{Catalog, CatalogDefaults};

/// Options for building a catalog from a `<root>/<experiment>/<dataset>/<model>.yaml` tree.
#[derive(Debug, Clone, Default)]
pub struct DiscoverOpts {
    pub configs_root: PathBuf,
    pub experiment: String,
    /// Dataset names to keep; empty keeps all.
    pub datasets: Vec<String>,
    /// Glob patterns over model names; empty keeps all.
    pub models: Vec<String>,
    /// Hyperparameters recorded as catalog defaults.
    pub hyperparameters: BTreeMap<String, Value>,
    pub batch: Option<String>,
}

fn discover_error(code: &str, message: impl Into<String>) -> XsubError {
    XsubError::catalog(code, message)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, XsubError> {
    let mut builder = GlobSetBuilder::new();
    if patterns.is_empty() {
        builder.add(Glob::new("*").map_err(|err| discover_error("discover_glob", err.to_string()))?);
    } else {
        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|err| {
                XsubError::Catalog(
                    ErrorInfo::new("discover_glob", err.to_string())
                        .with_context("pattern", pattern.clone()),
                )
            })?;
            builder.add(glob);
        }
    }
    builder
        .build()
        .map_err(|err| discover_error("discover_glob_build", err.to_string()))
}

/// Walks the config tree and emits one job per dataset/model config file.
///
/// Jobs come out sorted by dataset then model so the catalog is stable across
/// filesystems.
pub fn discover_catalog(opts: &DiscoverOpts) -> Result<Catalog, XsubError> {
    let experiment_dir = opts.configs_root.join(&opts.experiment);
    if !experiment_dir.is_dir() {
        return Err(XsubError::Catalog(
            ErrorInfo::new("discover_root_missing", "experiment config directory not found")
                .with_context("path", experiment_dir.display().to_string()),
        ));
    }
    let model_filter = build_globset(&opts.models)?;

    let mut jobs = Vec::new();
    let walker = WalkDir::new(&experiment_dir)
        .min_depth(2)
        .max_depth(2)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry.map_err(|err| {
            XsubError::Catalog(
                ErrorInfo::new("discover_walk", err.to_string())
                    .with_context("path", experiment_dir.display().to_string()),
            )
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("yaml") {
            continue;
        }
        let dataset = match path
            .parent()
            .and_then(|parent| parent.file_name())
            .and_then(|name| name.to_str())
        {
            Some(name) => name,
            None => continue,
        };
        let model = match path.file_stem().and_then(|stem| stem.to_str()) {
            Some(stem) => stem,
            None => continue,
        };
        if !opts.datasets.is_empty() && !opts.datasets.iter().any(|name| name == dataset) {
            continue;
        }
        if !model_filter.is_match(model) {
            continue;
        }
        tracing::debug!(dataset, model, path = %path.display(), "discovered config");
        jobs.push(JobSpec::new(path.display().to_string(), [model]));
    }

    if jobs.is_empty() {
        return Err(XsubError::Catalog(
            ErrorInfo::new("discover_empty", "no config matched the filters")
                .with_context("path", experiment_dir.display().to_string()),
        ));
    }
    let catalog = Catalog {
        batch: opts.batch.clone(),
        defaults: CatalogDefaults {
            hyperparameters: opts.hyperparameters.clone(),
        },
        jobs,
    };
    catalog.validate()?;
    Ok(catalog)
}

/// Parses `key=value` pairs, reading values as YAML scalars (`300` → integer).
pub fn parse_hyperparameters(pairs: &[String]) -> Result<BTreeMap<String, Value>, XsubError> {
    let mut params = BTreeMap::new();
    for pair in pairs {
        let Some((key, raw)) = pair.split_once('=') else {
            return Err(XsubError::Catalog(
                ErrorInfo::new("hyperparameter_syntax", "expected key=value")
                    .with_context("argument", pair.clone()),
            ));
        };
        let value = serde_yaml::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        let value = match value {
            Value::Null | Value::Array(_) | Value::Object(_) => Value::String(raw.to_string()),
            scalar => scalar,
        };
        params.insert(key.trim().to_string(), value);
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hyperparameters_parse_as_scalars() {
        let params = parse_hyperparameters(&[
            "epochs=300".to_string(),
            "lr=0.1".to_string(),
            "optimizer=sgd".to_string(),
            "resume=true".to_string(),
            "note=".to_string(),
        ])
        .expect("parse");
        assert_eq!(params["epochs"], json!(300));
        assert_eq!(params["lr"], json!(0.1));
        assert_eq!(params["optimizer"], json!("sgd"));
        assert_eq!(params["resume"], json!(true));
        assert_eq!(params["note"], json!(""));
    }

    #[test]
    fn hyperparameters_require_equals() {
        let err = parse_hyperparameters(&["epochs".to_string()]).expect_err("syntax");
        assert_eq!(err.info().code, "hyperparameter_syntax");
    }
}
