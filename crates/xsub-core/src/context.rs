use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, XsubError};

/// Versioning context shared by every job of one orchestrator run.
///
/// The analysis version is the caller supplied batch identifier, so a batch
/// re-run under the same id carries the same tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionContext {
    container_id: String,
    execution_version: String,
    analysis_version: String,
}

impl ExecutionContext {
    /// Builds a context for the batch identified by `batch_id`.
    pub fn new(
        container_id: impl Into<String>,
        execution_version: impl Into<String>,
        batch_id: impl Into<String>,
    ) -> Result<Self, XsubError> {
        let context = Self {
            container_id: container_id.into(),
            execution_version: execution_version.into(),
            analysis_version: batch_id.into(),
        };
        check_token("container_id", &context.container_id)?;
        check_token("execution_version", &context.execution_version)?;
        check_token("batch_id", &context.analysis_version)?;
        Ok(context)
    }

    /// Container image or identifier the jobs run in.
    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    /// Campaign level version tag.
    pub fn execution_version(&self) -> &str {
        &self.execution_version
    }

    /// Batch level version tag.
    pub fn analysis_version(&self) -> &str {
        &self.analysis_version
    }
}

fn check_token(field: &str, value: &str) -> Result<(), XsubError> {
    if value.is_empty() || value.chars().any(|ch| ch.is_whitespace() || ch.is_control()) {
        return Err(XsubError::Environment(
            ErrorInfo::new(
                "context_field_invalid",
                "execution context fields must be non-empty and contain no whitespace",
            )
            .with_context("field", field)
            .with_context("value", value),
        ));
    }
    Ok(())
}
