#![deny(missing_docs)]
#![doc = "Core data model, structured errors and canonical serialization for xsub."]

pub mod errors;
/// Canonical hashing helpers.
pub mod hash;
/// Canonical JSON and YAML serde helpers.
pub mod serde;

mod context;
mod job;
mod result;

pub use crate::serde::{
    from_json_slice, from_yaml_slice, to_canonical_json_bytes, to_canonical_json_pretty,
    to_yaml_string,
};
pub use context::ExecutionContext;
pub use errors::{ErrorInfo, XsubError};
pub use hash::stable_hash_string;
pub use job::{render_scalar, JobSpec};
pub use result::{ExitStatus, JobState, SubmissionResult};
