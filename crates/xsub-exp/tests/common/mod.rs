#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::Mutex;

use xsub_core::errors::XsubError;
use xsub_core::{ExecutionContext, JobSpec};
use xsub_exp::{BackendReceipt, Catalog, SubmissionBackend, SubmissionRequest};

/// Backend that records every request and rejects selected config paths.
#[derive(Default)]
pub struct RecordingBackend {
    failing: BTreeSet<String>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl RecordingBackend {
    pub fn failing_on(configs: &[&str]) -> Self {
        Self {
            failing: configs.iter().map(|config| config.to_string()).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl SubmissionBackend for RecordingBackend {
    fn submit(&self, request: &SubmissionRequest<'_>) -> Result<BackendReceipt, XsubError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push(request.arguments());
        if self.failing.contains(request.config_path) {
            return Err(XsubError::dispatch("backend_exit", "queue rejected job"));
        }
        Ok(BackendReceipt::accepted())
    }
}

pub fn context(batch: &str) -> ExecutionContext {
    ExecutionContext::new("pytorch-1.0", "v1.0", batch).expect("context")
}

pub fn example_jobs() -> Vec<JobSpec> {
    vec![
        JobSpec::new("fisher_rao_norm.yaml", ["mlp1wb", "mlp2wb", "mlp5wb"])
            .with_hyperparameter("epochs", 300),
        JobSpec::new("l2_norm.yaml", Vec::<String>::new()).with_hyperparameter("epochs", 300),
    ]
}

pub fn example_catalog() -> Catalog {
    Catalog::from_jobs(example_jobs())
}
