use std::error::Error;

use clap::Args;
use xsub_exp::{DryRunBackend, Orchestrator};

use super::BatchArgs;

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub batch: BatchArgs,
    /// Also print the catalog fingerprint.
    #[arg(long)]
    pub hash: bool,
}

pub fn run(args: &PlanArgs) -> Result<(), Box<dyn Error>> {
    let setup = args.batch.resolve()?;
    let backend = DryRunBackend::for_program(
        setup.config.backend.program.clone(),
        setup.config.backend.args.clone(),
    );
    let orchestrator = Orchestrator::new(backend);
    if args.hash {
        println!("# catalog {}", setup.catalog.catalog_hash()?);
    }
    for line in orchestrator.plan(&setup.context, &setup.catalog.resolved_jobs()) {
        println!("{line}");
    }
    Ok(())
}
