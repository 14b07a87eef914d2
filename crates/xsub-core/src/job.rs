use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ErrorInfo, XsubError};

/// Argument names the invocation layout reserves for itself.
const RESERVED_KEYS: &[&str] = &["models"];

/// A single analysis task: one config file, an optional model selection and
/// the hyperparameters forwarded to the analysis.
///
/// An empty `model_ids` list means "let the backend use its default model set".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobSpec {
    #[serde(rename = "config", alias = "analysis_config_path")]
    analysis_config_path: String,
    #[serde(rename = "models", alias = "model_ids", default)]
    model_ids: Vec<String>,
    #[serde(default)]
    hyperparameters: BTreeMap<String, Value>,
}

impl JobSpec {
    /// Creates a job for the provided config path and model selection.
    pub fn new<I, S>(analysis_config_path: impl Into<String>, model_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            analysis_config_path: analysis_config_path.into(),
            model_ids: model_ids.into_iter().map(Into::into).collect(),
            hyperparameters: BTreeMap::new(),
        }
    }

    /// Returns a copy of the job with an additional hyperparameter.
    pub fn with_hyperparameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.hyperparameters.insert(key.into(), value.into());
        self
    }

    /// Path of the analysis configuration file.
    pub fn analysis_config_path(&self) -> &str {
        &self.analysis_config_path
    }

    /// Ordered model identifiers; empty selects the backend default set.
    pub fn model_ids(&self) -> &[String] {
        &self.model_ids
    }

    /// Hyperparameters keyed by argument name.
    pub fn hyperparameters(&self) -> &BTreeMap<String, Value> {
        &self.hyperparameters
    }

    /// Model selection to forward, or `None` when the default set applies.
    pub fn model_selection(&self) -> Option<&[String]> {
        if self.model_ids.is_empty() {
            None
        } else {
            Some(&self.model_ids)
        }
    }

    /// Fills in hyperparameters missing from this job with the given defaults.
    pub fn merged_with_defaults(mut self, defaults: &BTreeMap<String, Value>) -> Self {
        for (key, value) in defaults {
            self.hyperparameters
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        self
    }

    /// Renders the hyperparameters into backend arguments in sorted key order.
    pub fn extra_args(&self) -> BTreeMap<String, String> {
        self.hyperparameters
            .iter()
            .filter_map(|(key, value)| render_scalar(value).map(|text| (key.clone(), text)))
            .collect()
    }

    /// Checks the job definition, reporting the first problem as a catalog error.
    pub fn validate(&self) -> Result<(), XsubError> {
        if self.analysis_config_path.trim().is_empty() {
            return Err(XsubError::Catalog(ErrorInfo::new(
                "job_config_missing",
                "job does not name an analysis config",
            )));
        }
        let mut seen = BTreeSet::new();
        for model in &self.model_ids {
            if model.trim().is_empty()
                || model.starts_with('-')
                || model.chars().any(char::is_whitespace)
            {
                return Err(XsubError::Catalog(
                    ErrorInfo::new("job_model_invalid", "model identifiers must be non-blank tokens")
                        .with_context("config", self.analysis_config_path.clone())
                        .with_context("model", model.clone())
                        .with_hint("model identifiers may not start with `-`"),
                ));
            }
            if !seen.insert(model.as_str()) {
                return Err(XsubError::Catalog(
                    ErrorInfo::new("job_model_duplicate", "model listed more than once")
                        .with_context("config", self.analysis_config_path.clone())
                        .with_context("model", model.clone()),
                ));
            }
        }
        for (key, value) in &self.hyperparameters {
            if key.is_empty() || key.starts_with('-') || key.chars().any(char::is_whitespace) {
                return Err(XsubError::Catalog(
                    ErrorInfo::new("job_hyperparameter_key", "invalid hyperparameter name")
                        .with_context("config", self.analysis_config_path.clone())
                        .with_context("key", key.clone())
                        .with_hint("use bare names such as `epochs` or `model-seed`"),
                ));
            }
            if RESERVED_KEYS.contains(&key.as_str()) {
                return Err(XsubError::Catalog(
                    ErrorInfo::new("job_hyperparameter_reserved", "hyperparameter name is reserved")
                        .with_context("config", self.analysis_config_path.clone())
                        .with_context("key", key.clone())
                        .with_hint("list models under `models` instead"),
                ));
            }
            if render_scalar(value).is_none() {
                return Err(XsubError::Catalog(
                    ErrorInfo::new(
                        "job_hyperparameter_value",
                        "hyperparameters must be strings, numbers or booleans",
                    )
                    .with_context("config", self.analysis_config_path.clone())
                    .with_context("key", key.clone()),
                ));
            }
            if value.as_str().is_some_and(|text| text.starts_with('-')) {
                return Err(XsubError::Catalog(
                    ErrorInfo::new(
                        "job_hyperparameter_value",
                        "string hyperparameters may not start with `-`",
                    )
                    .with_context("config", self.analysis_config_path.clone())
                    .with_context("key", key.clone())
                    .with_hint("the value would be read as a flag"),
                ));
            }
        }
        Ok(())
    }
}

/// Renders a scalar JSON value as a single command line token.
pub fn render_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
