mod common;

use common::{context, example_catalog, example_jobs, RecordingBackend};
use xsub_core::errors::XsubError;
use xsub_core::{ExitStatus, JobSpec, JobState};
use xsub_exp::{
    Catalog, DryRunBackend, EnvironmentConfig, FsEnvironment, Orchestrator, Scheduler,
    SubmissionBackend,
};

#[test]
fn example_catalog_renders_expected_arguments() {
    let orchestrator = Orchestrator::new(RecordingBackend::default());
    let ctx = context("beta-v2.0");
    let results = orchestrator.run(&ctx, &example_jobs());
    assert_eq!(results.len(), 2);

    assert_eq!(
        results[0].invocation,
        "submit pytorch-1.0 v1.0 beta-v2.0 fisher_rao_norm.yaml --models mlp1wb mlp2wb mlp5wb --epochs 300"
    );
    assert_eq!(
        results[1].invocation,
        "submit pytorch-1.0 v1.0 beta-v2.0 l2_norm.yaml --epochs 300"
    );
    assert!(!results[1].invocation.contains("--models"));

    let calls = orchestrator.backend().calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[1],
        ["pytorch-1.0", "v1.0", "beta-v2.0", "l2_norm.yaml", "--epochs", "300"]
    );
}

#[test]
fn failed_job_does_not_stop_the_batch() {
    let jobs = vec![
        JobSpec::new("a.yaml", ["m1"]),
        JobSpec::new("b.yaml", ["m1"]),
        JobSpec::new("c.yaml", ["m1"]),
    ];
    let orchestrator = Orchestrator::new(RecordingBackend::failing_on(&["b.yaml"]));
    let results = orchestrator.run(&context("beta"), &jobs);

    let statuses: Vec<_> = results.iter().map(|result| result.exit_status).collect();
    assert_eq!(
        statuses,
        [ExitStatus::Success, ExitStatus::Failure, ExitStatus::Success]
    );
    let diagnostic = results[1].diagnostic.as_deref().expect("diagnostic");
    assert!(diagnostic.contains("queue rejected job"));
    assert!(results[0].diagnostic.is_none());
    assert_eq!(orchestrator.backend().calls().len(), 3);

    let states: Vec<_> = results.iter().map(|result| result.state).collect();
    assert_eq!(
        states,
        [JobState::Succeeded, JobState::Failed, JobState::Succeeded]
    );
    assert!(results.iter().all(|result| result.state.is_terminal()));
}

#[test]
fn analysis_version_is_shared_within_a_run() {
    let orchestrator = Orchestrator::new(RecordingBackend::default());
    orchestrator.run(&context("beta-v2.0"), &example_jobs());
    for call in orchestrator.backend().calls() {
        assert_eq!(call[2], "beta-v2.0");
    }
}

#[test]
fn reruns_produce_identical_invocations() {
    let orchestrator = Orchestrator::new(DryRunBackend::default());
    let first = orchestrator.plan(&context("beta-v2.0"), &example_jobs());
    let second = orchestrator.plan(&context("beta-v2.0"), &example_jobs());
    assert_eq!(first, second);

    let other = orchestrator.plan(&context("beta-v2.1"), &example_jobs());
    assert_ne!(first, other);
}

#[test]
fn parallel_dispatch_keeps_catalog_order() {
    let jobs: Vec<JobSpec> = (0..32)
        .map(|idx| JobSpec::new(format!("cfg_{idx:02}.yaml"), ["m"]))
        .collect();
    let orchestrator = Orchestrator::new(RecordingBackend::failing_on(&["cfg_07.yaml"]))
        .with_scheduler(Scheduler::with_parallelism(4));
    let results = orchestrator.run(&context("beta"), &jobs);
    assert_eq!(results.len(), jobs.len());
    for (idx, result) in results.iter().enumerate() {
        assert_eq!(result.index, idx);
        assert_eq!(result.job, jobs[idx]);
        assert_eq!(result.succeeded(), idx != 7);
    }
}

#[test]
fn run_batch_reports_every_job() {
    let orchestrator = Orchestrator::new(RecordingBackend::failing_on(&["l2_norm.yaml"]));
    let env = FsEnvironment::new(EnvironmentConfig::default());
    let report = orchestrator
        .run_batch(&env, &context("beta-v2.0"), &example_catalog())
        .expect("batch");
    assert_eq!(report.summary.total, 2);
    assert_eq!(report.summary.succeeded, 1);
    assert_eq!(report.summary.failed, 1);
    assert!(!report.all_succeeded());
    assert_eq!(report.failures().count(), 1);
    assert_eq!(report.context.analysis_version(), "beta-v2.0");
    assert_eq!(report.catalog_hash, example_catalog().catalog_hash().expect("hash"));
}

#[test]
fn environment_failure_aborts_before_dispatch() {
    let temp = tempfile::tempdir().expect("tmp dir");
    let env = FsEnvironment::new(EnvironmentConfig {
        storage_root: Some(temp.path().join("missing")),
        ..EnvironmentConfig::default()
    });
    let orchestrator = Orchestrator::new(RecordingBackend::default());
    let err = orchestrator
        .run_batch(&env, &context("beta"), &example_catalog())
        .expect_err("environment");
    assert!(matches!(err, XsubError::Environment(_)));
    assert!(orchestrator.backend().calls().is_empty());
}

#[test]
fn empty_catalog_aborts_before_dispatch() {
    let orchestrator = Orchestrator::new(RecordingBackend::default());
    let env = FsEnvironment::new(EnvironmentConfig::default());
    let err = orchestrator
        .run_batch(&env, &context("beta"), &Catalog::from_jobs(Vec::new()))
        .expect_err("catalog");
    assert_eq!(err.info().code, "catalog_empty");
    assert!(orchestrator.backend().calls().is_empty());
}

#[test]
fn empty_job_list_yields_no_results() {
    let orchestrator = Orchestrator::new(RecordingBackend::default());
    assert!(orchestrator.run(&context("beta"), &[]).is_empty());
}

#[test]
fn dry_run_uses_configured_program() {
    let backend = DryRunBackend::for_program("/opt/bin/submit", vec!["--cluster".to_string(), "beluga".to_string()]);
    let ctx = context("beta");
    let job = JobSpec::new("a.yaml", ["m1"]);
    let request = xsub_exp::SubmissionRequest::new(&ctx, &job);
    assert_eq!(
        backend.invocation(&request).command_line(),
        "/opt/bin/submit --cluster beluga pytorch-1.0 v1.0 beta a.yaml --models m1"
    );
    let receipt = backend.submit(&request).expect("dry run");
    assert_eq!(receipt.attempts, 1);
}
