use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, XsubError};
use crate::job::JobSpec;

/// Outcome of handing one job to the submission backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExitStatus {
    /// The backend accepted the job.
    Success,
    /// The backend rejected the job or could not be reached.
    Failure,
}

/// Lifecycle of a job inside one run. Jobs cannot be withdrawn once dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobState {
    /// Defined in the catalog, not yet handed over.
    Pending,
    /// Handed to the backend, outcome not yet known.
    Dispatched,
    /// Accepted by the backend.
    Succeeded,
    /// Rejected by the backend.
    Failed,
}

impl JobState {
    /// Moves a pending job into the dispatched state.
    pub fn dispatch(self) -> Result<JobState, XsubError> {
        match self {
            JobState::Pending => Ok(JobState::Dispatched),
            other => Err(illegal_transition(other, "dispatch")),
        }
    }

    /// Records the backend outcome for a dispatched job.
    pub fn complete(self, status: ExitStatus) -> Result<JobState, XsubError> {
        match (self, status) {
            (JobState::Dispatched, ExitStatus::Success) => Ok(JobState::Succeeded),
            (JobState::Dispatched, ExitStatus::Failure) => Ok(JobState::Failed),
            (other, _) => Err(illegal_transition(other, "complete")),
        }
    }

    /// Returns true once no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

fn illegal_transition(from: JobState, event: &str) -> XsubError {
    XsubError::Dispatch(
        ErrorInfo::new("job_state_transition", "illegal job state transition")
            .with_context("from", format!("{from:?}"))
            .with_context("event", event),
    )
}

/// Immutable record of a single job's submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionResult {
    /// Position of the job in the catalog.
    pub index: usize,
    /// The job that was submitted.
    pub job: JobSpec,
    /// Backend outcome.
    pub exit_status: ExitStatus,
    /// Lifecycle state the job ended in.
    pub state: JobState,
    /// Rendered command line handed to the backend.
    pub invocation: String,
    /// Number of backend attempts reported for the job.
    #[serde(default)]
    pub attempts: u32,
    /// Diagnostic text for failed submissions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl SubmissionResult {
    /// Returns true when the backend accepted the job.
    pub fn succeeded(&self) -> bool {
        self.exit_status == ExitStatus::Success
    }
}
