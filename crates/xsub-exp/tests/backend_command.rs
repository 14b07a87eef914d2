#![cfg(unix)]

use std::collections::BTreeMap;
use std::fs;
use std::sync::atomic::{AtomicU32, Ordering};

use tempfile::tempdir;
use xsub_core::errors::{ErrorInfo, XsubError};
use xsub_core::{ExecutionContext, JobSpec};
use xsub_exp::{
    failed_attempts, BackendReceipt, CommandBackend, RetryingBackend, SubmissionBackend,
    SubmissionRequest,
};

fn sample() -> (ExecutionContext, JobSpec) {
    let ctx = ExecutionContext::new("pytorch-1.0", "v1.0", "beta-v2.0").expect("context");
    let job = JobSpec::new("fisher_rao_norm.yaml", ["mlp1wb"]).with_hyperparameter("epochs", 300);
    (ctx, job)
}

fn shell(script: &str) -> CommandBackend {
    CommandBackend::new("sh").with_prefix_args(vec![
        "-c".to_string(),
        script.to_string(),
        "submit".to_string(),
    ])
}

#[test]
fn zero_exit_is_accepted() {
    let (ctx, job) = sample();
    let receipt = CommandBackend::new("true")
        .submit(&SubmissionRequest::new(&ctx, &job))
        .expect("accepted");
    assert_eq!(receipt.attempts, 1);
}

#[test]
fn arguments_and_env_reach_the_program() {
    let dir = tempdir().expect("tmp dir");
    let out = dir.path().join("args.txt");
    let script = format!("echo \"$XSUB_STORAGE_ROOT $*\" > {}", out.display());
    let env = BTreeMap::from([("XSUB_STORAGE_ROOT".to_string(), "/scratch".to_string())]);
    let (ctx, job) = sample();
    shell(&script)
        .with_env(env)
        .submit(&SubmissionRequest::new(&ctx, &job))
        .expect("accepted");
    let written = fs::read_to_string(out).expect("read");
    assert_eq!(
        written.trim(),
        "/scratch pytorch-1.0 v1.0 beta-v2.0 fisher_rao_norm.yaml --models mlp1wb --epochs 300"
    );
}

#[test]
fn non_zero_exit_carries_stderr_tail() {
    let (ctx, job) = sample();
    let err = shell("echo first >&2; echo 'queue full' >&2; exit 4")
        .with_stderr_tail(1)
        .submit(&SubmissionRequest::new(&ctx, &job))
        .expect_err("rejected");
    assert!(matches!(err, XsubError::Dispatch(_)));
    assert_eq!(err.info().code, "backend_exit");
    assert_eq!(err.info().message, "queue full");
    assert_eq!(err.info().context["status"], "4");
}

#[test]
fn missing_program_is_a_dispatch_error() {
    let (ctx, job) = sample();
    let err = CommandBackend::new("/nonexistent/xsub-submit")
        .submit(&SubmissionRequest::new(&ctx, &job))
        .expect_err("spawn");
    assert_eq!(err.info().code, "backend_spawn");
}

struct FlakyBackend {
    failures_left: AtomicU32,
}

impl SubmissionBackend for FlakyBackend {
    fn submit(&self, _request: &SubmissionRequest<'_>) -> Result<BackendReceipt, XsubError> {
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(XsubError::dispatch("backend_exit", "transient"));
        }
        Ok(BackendReceipt::accepted())
    }
}

#[test]
fn retries_stop_at_first_success() {
    let (ctx, job) = sample();
    let backend = RetryingBackend::new(
        FlakyBackend {
            failures_left: AtomicU32::new(2),
        },
        5,
    );
    let receipt = backend
        .submit(&SubmissionRequest::new(&ctx, &job))
        .expect("eventually accepted");
    assert_eq!(receipt.attempts, 3);
}

#[test]
fn retries_give_up_after_max_attempts() {
    let (ctx, job) = sample();
    let backend = RetryingBackend::new(
        FlakyBackend {
            failures_left: AtomicU32::new(10),
        },
        3,
    );
    let err = backend
        .submit(&SubmissionRequest::new(&ctx, &job))
        .expect_err("exhausted");
    assert_eq!(failed_attempts(&err), 3);
    assert_eq!(backend.inner().failures_left.load(Ordering::SeqCst), 7);
}

struct UnreadyBackend {
    calls: AtomicU32,
}

impl SubmissionBackend for UnreadyBackend {
    fn submit(&self, _request: &SubmissionRequest<'_>) -> Result<BackendReceipt, XsubError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(XsubError::Environment(ErrorInfo::new(
            "storage_root_missing",
            "storage root vanished",
        )))
    }
}

#[test]
fn fatal_errors_are_not_retried() {
    let (ctx, job) = sample();
    let backend = RetryingBackend::new(
        UnreadyBackend {
            calls: AtomicU32::new(0),
        },
        4,
    );
    let err = backend
        .submit(&SubmissionRequest::new(&ctx, &job))
        .expect_err("fatal");
    assert!(matches!(err, XsubError::Environment(_)));
    assert_eq!(failed_attempts(&err), 1);
    assert_eq!(backend.inner().calls.load(Ordering::SeqCst), 1);
}
