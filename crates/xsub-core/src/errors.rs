//! Structured error types shared across xsub crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`XsubError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (paths, job indices, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the submission orchestrator.
///
/// `Catalog` and `Environment` abort a run before anything is dispatched.
/// `Dispatch` is scoped to a single job and is folded into that job's
/// [`crate::SubmissionResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum XsubError {
    /// Missing or malformed job catalog.
    #[error("catalog error: {0}")]
    Catalog(ErrorInfo),
    /// A single job could not be handed to the submission backend.
    #[error("dispatch error: {0}")]
    Dispatch(ErrorInfo),
    /// Environment precondition or execution context not satisfied.
    #[error("environment error: {0}")]
    Environment(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
    /// Filesystem errors while persisting artefacts.
    #[error("io error: {0}")]
    Io(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl XsubError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            XsubError::Catalog(info)
            | XsubError::Dispatch(info)
            | XsubError::Environment(info)
            | XsubError::Serde(info)
            | XsubError::Io(info) => info,
        }
    }

    /// Adds a context entry to the payload without changing the family.
    pub fn with_context(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        match self {
            XsubError::Catalog(info) => XsubError::Catalog(info.with_context(key, value)),
            XsubError::Dispatch(info) => XsubError::Dispatch(info.with_context(key, value)),
            XsubError::Environment(info) => XsubError::Environment(info.with_context(key, value)),
            XsubError::Serde(info) => XsubError::Serde(info.with_context(key, value)),
            XsubError::Io(info) => XsubError::Io(info.with_context(key, value)),
        }
    }

    /// Returns true when the error must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, XsubError::Dispatch(_))
    }

    /// Convenience constructor for catalog failures.
    pub fn catalog(code: impl Into<String>, message: impl Into<String>) -> Self {
        XsubError::Catalog(ErrorInfo::new(code, message))
    }

    /// Convenience constructor for dispatch failures.
    pub fn dispatch(code: impl Into<String>, message: impl Into<String>) -> Self {
        XsubError::Dispatch(ErrorInfo::new(code, message))
    }

    /// Wraps an I/O failure under the provided code.
    pub fn io(code: impl Into<String>, err: impl ToString) -> Self {
        XsubError::Io(ErrorInfo::new(code, err.to_string()))
    }
}
