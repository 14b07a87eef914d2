use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use xsub_core::errors::XsubError;
use xsub_core::{ExecutionContext, ExitStatus, JobSpec, JobState, SubmissionResult};

use crate::backend::{failed_attempts, SubmissionBackend};
use crate::catalog::Catalog;
use crate::environment::EnvironmentProvisioner;
use crate::invocation::SubmissionRequest;
use crate::report::SubmissionReport;

/// Scheduler configuration controlling how many jobs are dispatched at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scheduler {
    /// Maximum number of jobs in flight; values below one act as one.
    #[serde(default = "Scheduler::default_parallelism")]
    pub parallelism: usize,
}

impl Scheduler {
    const fn default_parallelism() -> usize {
        1
    }

    /// Scheduler with the given parallelism, clamped to at least one.
    pub fn with_parallelism(parallelism: usize) -> Self {
        Self {
            parallelism: parallelism.max(1),
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            parallelism: Self::default_parallelism(),
        }
    }
}

/// Composes versioned invocations and hands them to a [`SubmissionBackend`].
///
/// Jobs are independent: a failed submission is recorded and the batch moves
/// on. Retrying is left to the backend.
#[derive(Debug, Clone)]
pub struct Orchestrator<B> {
    backend: B,
    scheduler: Scheduler,
}

impl<B: SubmissionBackend> Orchestrator<B> {
    /// Orchestrator dispatching one job at a time.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            scheduler: Scheduler::default(),
        }
    }

    /// Replaces the scheduler, e.g. to dispatch jobs concurrently.
    pub fn with_scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// The backend jobs are handed to.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Rendered command lines for `jobs` without dispatching anything.
    pub fn plan(&self, context: &ExecutionContext, jobs: &[JobSpec]) -> Vec<String> {
        jobs.iter()
            .map(|job| {
                let request = SubmissionRequest::new(context, job);
                self.backend.invocation(&request).command_line()
            })
            .collect()
    }

    /// Dispatches every job and returns one result per job, in input order.
    pub fn run(&self, context: &ExecutionContext, jobs: &[JobSpec]) -> Vec<SubmissionResult> {
        let parallelism = self.scheduler.parallelism.max(1);
        if parallelism == 1 || jobs.len() < 2 {
            return jobs
                .iter()
                .enumerate()
                .map(|(index, job)| self.dispatch(index, context, job))
                .collect();
        }
        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(parallelism)
            .build()
        {
            Ok(pool) => pool,
            Err(err) => {
                tracing::warn!(error = %err, "thread pool unavailable, dispatching sequentially");
                return jobs
                    .iter()
                    .enumerate()
                    .map(|(index, job)| self.dispatch(index, context, job))
                    .collect();
            }
        };
        // Indexed collect keeps one slot per job, so input order survives.
        pool.install(|| {
            jobs.par_iter()
                .enumerate()
                .map(|(index, job)| self.dispatch(index, context, job))
                .collect()
        })
    }

    /// Checks the environment, validates the catalog and submits all of its jobs.
    ///
    /// Only setup problems are returned as errors; per-job failures end up in
    /// the report.
    pub fn run_batch(
        &self,
        provisioner: &dyn EnvironmentProvisioner,
        context: &ExecutionContext,
        catalog: &Catalog,
    ) -> Result<SubmissionReport, XsubError> {
        provisioner.ensure_ready()?;
        catalog.validate()?;
        catalog.check_batch(context.analysis_version())?;
        let catalog_hash = catalog.catalog_hash()?;
        let jobs = catalog.resolved_jobs();
        tracing::info!(
            batch = context.analysis_version(),
            execution_version = context.execution_version(),
            container = context.container_id(),
            jobs = jobs.len(),
            parallelism = self.scheduler.parallelism,
            catalog_hash = %catalog_hash,
            "submitting batch"
        );
        let results = self.run(context, &jobs);
        let report = SubmissionReport::new(context.clone(), catalog_hash, results);
        tracing::info!(
            batch = context.analysis_version(),
            succeeded = report.summary.succeeded,
            failed = report.summary.failed,
            "batch dispatched"
        );
        Ok(report)
    }

    fn dispatch(&self, index: usize, context: &ExecutionContext, job: &JobSpec) -> SubmissionResult {
        let request = SubmissionRequest::new(context, job);
        let invocation = self.backend.invocation(&request).command_line();
        let outcome = JobState::Pending.dispatch().and_then(|state| {
            tracing::debug!(
                job = index,
                config = job.analysis_config_path(),
                state = ?state,
                command = %invocation,
                "dispatching job"
            );
            let submitted = self.backend.submit(&request);
            let status = match submitted {
                Ok(_) => ExitStatus::Success,
                Err(_) => ExitStatus::Failure,
            };
            state.complete(status).map(|state| (state, submitted))
        });
        let (state, exit_status, attempts, diagnostic) = match outcome {
            Ok((state, Ok(receipt))) => {
                tracing::info!(
                    job = index,
                    config = job.analysis_config_path(),
                    state = ?state,
                    attempts = receipt.attempts,
                    detail = receipt.detail.as_deref().unwrap_or(""),
                    "job submitted"
                );
                (state, ExitStatus::Success, receipt.attempts, None)
            }
            Ok((state, Err(err))) => {
                tracing::error!(
                    job = index,
                    config = job.analysis_config_path(),
                    state = ?state,
                    error = %err,
                    "job submission failed"
                );
                (state, ExitStatus::Failure, failed_attempts(&err), Some(err.to_string()))
            }
            Err(err) => {
                tracing::error!(job = index, error = %err, "job left its lifecycle");
                (JobState::Failed, ExitStatus::Failure, 0, Some(err.to_string()))
            }
        };
        SubmissionResult {
            index,
            job: job.clone(),
            exit_status,
            state,
            invocation,
            attempts,
            diagnostic,
        }
    }
}
