use std::error::Error;

use clap::{Parser, Subcommand};
use commands::{
    discover::{self, DiscoverArgs},
    plan::{self, PlanArgs},
    submit::{self, SubmitArgs},
    version::{self, VersionArgs},
};

mod commands;
mod config;
mod logging;

#[derive(Parser, Debug)]
#[command(name = "xsub", about = "Submit versioned experiment batches to a cluster")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Emit logs as JSON lines.
    #[arg(long = "log-json", global = true)]
    log_json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit every job of a batch catalog.
    Submit(SubmitArgs),
    /// Print the invocations of a batch without submitting.
    Plan(PlanArgs),
    /// Build a catalog from a config directory tree.
    Discover(DiscoverArgs),
    /// Print version information.
    Version(VersionArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose, cli.log_json);
    match cli.command {
        Command::Submit(args) => submit::run(&args),
        Command::Plan(args) => plan::run(&args),
        Command::Discover(args) => discover::run(&args),
        Command::Version(args) => version::run(&args),
    }
}
