use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use xsub_core::errors::{ErrorInfo, XsubError};

use crate::invocation::{Invocation, SubmissionRequest, DEFAULT_PROGRAM};

/// Acknowledgement returned by a backend that accepted a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendReceipt {
    /// Number of attempts the backend needed.
    pub attempts: u32,
    /// Free form output worth surfacing, e.g. a scheduler job id.
    pub detail: Option<String>,
}

impl BackendReceipt {
    /// Receipt for a job accepted on the first attempt.
    pub fn accepted() -> Self {
        Self {
            attempts: 1,
            detail: None,
        }
    }
}

/// Capability that hands a single job to the cluster.
///
/// Implementations must be reentrant when the orchestrator runs with a
/// parallelism above one.
pub trait SubmissionBackend: Send + Sync {
    /// The invocation this backend would execute for `request`.
    fn invocation(&self, request: &SubmissionRequest<'_>) -> Invocation {
        Invocation::new(DEFAULT_PROGRAM, &[], request)
    }

    /// Submits the job; any error is reported as a failed submission.
    fn submit(&self, request: &SubmissionRequest<'_>) -> Result<BackendReceipt, XsubError>;
}

impl<B: SubmissionBackend + ?Sized> SubmissionBackend for Box<B> {
    fn invocation(&self, request: &SubmissionRequest<'_>) -> Invocation {
        (**self).invocation(request)
    }

    fn submit(&self, request: &SubmissionRequest<'_>) -> Result<BackendReceipt, XsubError> {
        (**self).submit(request)
    }
}

/// Runs an external submit program once per job.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    program: PathBuf,
    prefix_args: Vec<String>,
    env: BTreeMap<String, String>,
    stderr_tail: usize,
}

impl CommandBackend {
    /// Creates a backend spawning `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            prefix_args: Vec::new(),
            env: BTreeMap::new(),
            stderr_tail: 20,
        }
    }

    /// Arguments placed before the per-job arguments.
    pub fn with_prefix_args(mut self, args: Vec<String>) -> Self {
        self.prefix_args = args;
        self
    }

    /// Variables exported to the child process only.
    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Number of trailing stderr lines kept in failure diagnostics.
    pub fn with_stderr_tail(mut self, lines: usize) -> Self {
        self.stderr_tail = lines;
        self
    }
}

impl SubmissionBackend for CommandBackend {
    fn invocation(&self, request: &SubmissionRequest<'_>) -> Invocation {
        Invocation::new(
            self.program.to_string_lossy().into_owned(),
            &self.prefix_args,
            request,
        )
    }

    fn submit(&self, request: &SubmissionRequest<'_>) -> Result<BackendReceipt, XsubError> {
        let invocation = self.invocation(request);
        let output = Command::new(&self.program)
            .args(&invocation.args)
            .envs(&self.env)
            .stdin(Stdio::null())
            .output()
            .map_err(|err| {
                XsubError::Dispatch(
                    ErrorInfo::new("backend_spawn", "failed to start submit program")
                        .with_context("program", self.program.display().to_string())
                        .with_hint(err.to_string()),
                )
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let status = output
                .status
                .code()
                .map(|code| code.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(XsubError::Dispatch(
                ErrorInfo::new("backend_exit", tail(&stderr, self.stderr_tail))
                    .with_context("program", self.program.display().to_string())
                    .with_context("status", status),
            ));
        }
        tracing::debug!(config = request.config_path, stdout = %stdout, "submit program finished");
        Ok(BackendReceipt {
            attempts: 1,
            detail: (!stdout.is_empty()).then_some(stdout),
        })
    }
}

fn tail(text: &str, lines: usize) -> String {
    let collected: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();
    let start = collected.len().saturating_sub(lines.max(1));
    let joined = collected[start..].join("\n");
    if joined.is_empty() {
        "submit program exited unsuccessfully".to_string()
    } else {
        joined
    }
}

/// Accepts every job without executing anything.
#[derive(Debug, Clone, Default)]
pub struct DryRunBackend {
    program: Option<String>,
    prefix_args: Vec<String>,
}

impl DryRunBackend {
    /// Dry-run that renders invocations for `program` with the given prefix.
    pub fn for_program(program: impl Into<String>, prefix_args: Vec<String>) -> Self {
        Self {
            program: Some(program.into()),
            prefix_args,
        }
    }
}

impl SubmissionBackend for DryRunBackend {
    fn invocation(&self, request: &SubmissionRequest<'_>) -> Invocation {
        let program = self.program.as_deref().unwrap_or(DEFAULT_PROGRAM);
        Invocation::new(program, &self.prefix_args, request)
    }

    fn submit(&self, request: &SubmissionRequest<'_>) -> Result<BackendReceipt, XsubError> {
        tracing::info!(
            command = %self.invocation(request),
            "print-only: submission skipped"
        );
        Ok(BackendReceipt::accepted())
    }
}

/// Retries a wrapped backend until it accepts the job or attempts run out.
///
/// Only dispatch failures are retried; any other error family ends the job at once.
#[derive(Debug, Clone)]
pub struct RetryingBackend<B> {
    inner: B,
    max_attempts: u32,
}

impl<B: SubmissionBackend> RetryingBackend<B> {
    /// Wraps `inner`, allowing up to `max_attempts` tries per job (at least one).
    pub fn new(inner: B, max_attempts: u32) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
        }
    }

    /// The wrapped backend.
    pub fn inner(&self) -> &B {
        &self.inner
    }
}

impl<B: SubmissionBackend> SubmissionBackend for RetryingBackend<B> {
    fn invocation(&self, request: &SubmissionRequest<'_>) -> Invocation {
        self.inner.invocation(request)
    }

    fn submit(&self, request: &SubmissionRequest<'_>) -> Result<BackendReceipt, XsubError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.inner.submit(request) {
                Ok(receipt) => {
                    return Ok(BackendReceipt {
                        attempts: attempt,
                        ..receipt
                    })
                }
                Err(err) if !err.is_fatal() && attempt < self.max_attempts => {
                    tracing::warn!(
                        config = request.config_path,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "submission failed, retrying"
                    );
                }
                Err(err) => return Err(err.with_context("attempts", attempt.to_string())),
            }
        }
    }
}

/// Attempt count recorded on a failed submission, one when unknown.
pub fn failed_attempts(err: &XsubError) -> u32 {
    err.info()
        .context
        .get("attempts")
        .and_then(|value| value.parse().ok())
        .unwrap_or(1)
}
