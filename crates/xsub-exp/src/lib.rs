//! Catalog handling and submission orchestration for xsub batches.

mod backend;
mod catalog;
mod discover;
mod environment;
mod invocation;
mod ledger;
mod orchestrator;
mod report;

pub use backend::{
    failed_attempts, BackendReceipt, CommandBackend, DryRunBackend, RetryingBackend,
    SubmissionBackend,
};
pub use catalog::{load_catalog, Catalog, CatalogDefaults, CatalogStore};
pub use discover::{discover_catalog, parse_hyperparameters, DiscoverOpts};
pub use environment::{EnvironmentConfig, EnvironmentProvisioner, FsEnvironment, STORAGE_ROOT_VAR};
pub use invocation::{Invocation, SubmissionRequest, DEFAULT_PROGRAM, MODELS_FLAG};
pub use ledger::{ledger_append, ledger_read, Table};
pub use orchestrator::{Orchestrator, Scheduler};
pub use report::{ReportSummary, SubmissionReport};
