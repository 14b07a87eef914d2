use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use xsub_exp::{
    ledger_append, CommandBackend, DryRunBackend, EnvironmentProvisioner, FsEnvironment,
    Orchestrator, RetryingBackend, Scheduler, SubmissionBackend, SubmissionReport,
};

use super::BatchArgs;

#[derive(Args, Debug)]
pub struct SubmitArgs {
    #[command(flatten)]
    pub batch: BatchArgs,
    /// Print the invocations without submitting anything.
    #[arg(long = "print-only")]
    pub print_only: bool,
    /// Number of jobs dispatched concurrently.
    #[arg(long)]
    pub parallelism: Option<usize>,
    /// Extra attempts per job after a failed submission.
    #[arg(long)]
    pub retries: Option<u32>,
    /// Write the JSON submission report to this path.
    #[arg(long)]
    pub report: Option<PathBuf>,
    /// Append one CSV row per job to this ledger; ignored with `--print-only`.
    #[arg(long)]
    pub ledger: Option<PathBuf>,
}

pub fn run(args: &SubmitArgs) -> Result<(), Box<dyn Error>> {
    let setup = args.batch.resolve()?;
    let config = &setup.config;
    let mut environment = FsEnvironment::new(config.environment.clone());
    if args.print_only {
        environment = environment.check_only();
    }

    let backend: Box<dyn SubmissionBackend> = if args.print_only {
        Box::new(DryRunBackend::for_program(
            config.backend.program.clone(),
            config.backend.args.clone(),
        ))
    } else {
        Box::new(
            CommandBackend::new(&config.backend.program)
                .with_prefix_args(config.backend.args.clone())
                .with_env(environment.child_env())
                .with_stderr_tail(config.backend.stderr_tail),
        )
    };
    let attempts = args.retries.unwrap_or(config.retries).saturating_add(1);
    let scheduler = match args.parallelism {
        Some(parallelism) => Scheduler::with_parallelism(parallelism),
        None => config.scheduler.clone(),
    };
    let orchestrator =
        Orchestrator::new(RetryingBackend::new(backend, attempts)).with_scheduler(scheduler);

    let report = orchestrator.run_batch(&environment, &setup.context, &setup.catalog)?;
    print_report(&report, args.print_only);

    if let Some(path) = &args.report {
        report.write(path)?;
        tracing::info!(path = %path.display(), "report written");
    }
    if let Some(path) = args.ledger.as_ref().or(config.ledger.as_ref()) {
        if args.print_only {
            tracing::info!(path = %path.display(), "print-only: ledger left untouched");
        } else {
            ledger_append(path, &report)?;
            tracing::info!(path = %path.display(), "ledger updated");
        }
    }
    Ok(())
}

fn print_report(report: &SubmissionReport, print_only: bool) {
    for result in &report.results {
        if print_only {
            println!("{}", result.invocation);
            continue;
        }
        match &result.diagnostic {
            None => println!(
                "[ok]   #{:<3} {}",
                result.index,
                result.job.analysis_config_path()
            ),
            Some(diagnostic) => println!(
                "[fail] #{:<3} {} (attempts: {}): {}",
                result.index,
                result.job.analysis_config_path(),
                result.attempts,
                diagnostic
            ),
        }
    }
    println!(
        "batch {}: {} jobs, {} succeeded, {} failed",
        report.context.analysis_version(),
        report.summary.total,
        report.summary.succeeded,
        report.summary.failed
    );
}
