use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use xsub_core::{ExecutionContext, JobSpec};

/// Program name used when no backend specific program is configured.
pub const DEFAULT_PROGRAM: &str = "submit";

/// Flag introducing the model selection.
pub const MODELS_FLAG: &str = "--models";

/// Everything the backend needs to submit one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRequest<'a> {
    /// Container image or identifier.
    pub container_id: &'a str,
    /// Campaign level version tag.
    pub execution_version: &'a str,
    /// Batch level version tag.
    pub analysis_version: &'a str,
    /// Analysis configuration file.
    pub config_path: &'a str,
    /// Explicit model selection, `None` for the backend default set.
    pub model_ids: Option<&'a [String]>,
    /// Rendered hyperparameters keyed by argument name.
    pub extra_args: BTreeMap<String, String>,
}

impl<'a> SubmissionRequest<'a> {
    /// Composes the request for `job` under `context`.
    pub fn new(context: &'a ExecutionContext, job: &'a JobSpec) -> Self {
        Self {
            container_id: context.container_id(),
            execution_version: context.execution_version(),
            analysis_version: context.analysis_version(),
            config_path: job.analysis_config_path(),
            model_ids: job.model_selection(),
            extra_args: job.extra_args(),
        }
    }

    /// Positional and flag arguments in submission order.
    pub fn arguments(&self) -> Vec<String> {
        let mut args = vec![
            self.container_id.to_string(),
            self.execution_version.to_string(),
            self.analysis_version.to_string(),
            self.config_path.to_string(),
        ];
        if let Some(models) = self.model_ids {
            args.push(MODELS_FLAG.to_string());
            args.extend(models.iter().cloned());
        }
        for (key, value) in &self.extra_args {
            args.push(format!("--{key}"));
            args.push(value.clone());
        }
        args
    }
}

/// Concrete program invocation handed to an external submit tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    /// Builds the invocation `program prefix... <request arguments>`.
    pub fn new(program: impl Into<String>, prefix: &[String], request: &SubmissionRequest<'_>) -> Self {
        let mut args = prefix.to_vec();
        args.extend(request.arguments());
        Self {
            program: program.into(),
            args,
        }
    }

    /// Shell-safe single line rendering; identical input yields identical text.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(quote)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

fn quote(token: &str) -> String {
    let safe = !token.is_empty()
        && token
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || "-_./=:,+@%".contains(ch));
    if safe {
        token.to_string()
    } else {
        format!("'{}'", token.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting_leaves_plain_tokens_alone() {
        assert_eq!(quote("fisher_rao_norm.yaml"), "fisher_rao_norm.yaml");
        assert_eq!(quote("--epochs"), "--epochs");
        assert_eq!(quote("two words"), "'two words'");
        assert_eq!(quote("it's"), r"'it'\''s'");
        assert_eq!(quote(""), "''");
    }
}
