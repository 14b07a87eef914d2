use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Args;
use xsub_core::to_yaml_string;
use xsub_exp::{discover_catalog, parse_hyperparameters, DiscoverOpts};

#[derive(Args, Debug)]
pub struct DiscoverArgs {
    /// Root of the config tree (`<configs>/<experiment>/<dataset>/<model>.yaml`).
    #[arg(long, default_value = "configs")]
    pub configs: PathBuf,
    /// Experiment directory under the config root.
    #[arg(long)]
    pub experiment: String,
    /// Datasets to include; all when omitted.
    #[arg(long, num_args = 1..)]
    pub datasets: Vec<String>,
    /// Model name globs to include; all when omitted.
    #[arg(long, num_args = 1..)]
    pub models: Vec<String>,
    /// Default hyperparameters as `key=value`.
    #[arg(long = "hyper", value_name = "KEY=VALUE")]
    pub hyperparameters: Vec<String>,
    /// Batch id recorded in the catalog.
    #[arg(long)]
    pub batch: Option<String>,
    /// Output catalog path; stdout when omitted.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

pub fn run(args: &DiscoverArgs) -> Result<(), Box<dyn Error>> {
    let opts = DiscoverOpts {
        configs_root: args.configs.clone(),
        experiment: args.experiment.clone(),
        datasets: args.datasets.clone(),
        models: args.models.clone(),
        hyperparameters: parse_hyperparameters(&args.hyperparameters)?,
        batch: args.batch.clone(),
    };
    let catalog = discover_catalog(&opts)?;
    let yaml = to_yaml_string(&catalog)?;
    match &args.out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, yaml)?;
            tracing::info!(jobs = catalog.jobs.len(), path = %path.display(), "catalog written");
        }
        None => print!("{yaml}"),
    }
    Ok(())
}
