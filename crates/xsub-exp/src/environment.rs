use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use xsub_core::errors::{ErrorInfo, XsubError};

/// Variable carrying the storage root into submitted jobs.
pub const STORAGE_ROOT_VAR: &str = "XSUB_STORAGE_ROOT";

/// Precondition checked once before any job of a batch is dispatched.
pub trait EnvironmentProvisioner: Send + Sync {
    /// Returns an environment error when submissions must not start.
    fn ensure_ready(&self) -> Result<(), XsubError>;

    /// Variables the submit program needs; never applied to this process.
    fn child_env(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }
}

/// Storage paths and variables the submitted jobs rely on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentConfig {
    /// Directory that must exist before anything is submitted.
    #[serde(default)]
    pub storage_root: Option<PathBuf>,
    /// Cache directories created on demand, relative ones under `storage_root`.
    #[serde(default)]
    pub cache_dirs: Vec<PathBuf>,
    /// Extra variables exported to the submit program.
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

/// Filesystem backed provisioner built from an [`EnvironmentConfig`].
#[derive(Debug, Clone)]
pub struct FsEnvironment {
    config: EnvironmentConfig,
    create_dirs: bool,
}

impl FsEnvironment {
    /// Provisioner that creates missing cache directories when made ready.
    pub fn new(config: EnvironmentConfig) -> Self {
        Self {
            config,
            create_dirs: true,
        }
    }

    /// Checks the same preconditions but leaves the filesystem untouched.
    pub fn check_only(mut self) -> Self {
        self.create_dirs = false;
        self
    }

    /// Cache directories with relative entries resolved against the storage root.
    pub fn resolved_cache_dirs(&self) -> Vec<PathBuf> {
        self.config
            .cache_dirs
            .iter()
            .map(|dir| match &self.config.storage_root {
                Some(root) if dir.is_relative() => root.join(dir),
                _ => dir.clone(),
            })
            .collect()
    }

    fn check_storage_root(root: &Path) -> Result<(), XsubError> {
        if !root.is_dir() {
            return Err(XsubError::Environment(
                ErrorInfo::new("storage_root_missing", "storage root is not a directory")
                    .with_context("path", root.display().to_string())
                    .with_hint("create or mount the storage root before submitting"),
            ));
        }
        Ok(())
    }
}

impl EnvironmentProvisioner for FsEnvironment {
    fn ensure_ready(&self) -> Result<(), XsubError> {
        if let Some(root) = &self.config.storage_root {
            Self::check_storage_root(root)?;
        }
        for key in self.config.variables.keys() {
            if key.is_empty() || key.contains('=') || key.contains('\0') {
                return Err(XsubError::Environment(
                    ErrorInfo::new("variable_name_invalid", "invalid environment variable name")
                        .with_context("name", key.clone()),
                ));
            }
        }
        if !self.create_dirs {
            tracing::debug!(
                cache_dirs = self.config.cache_dirs.len(),
                "check-only environment: cache directories not created"
            );
            return Ok(());
        }
        for dir in self.resolved_cache_dirs() {
            fs::create_dir_all(&dir).map_err(|err| {
                XsubError::Environment(
                    ErrorInfo::new("cache_dir_create", "failed to create cache directory")
                        .with_context("path", dir.display().to_string())
                        .with_hint(err.to_string()),
                )
            })?;
        }
        tracing::debug!(
            storage_root = ?self.config.storage_root,
            cache_dirs = self.config.cache_dirs.len(),
            "environment ready"
        );
        Ok(())
    }

    fn child_env(&self) -> BTreeMap<String, String> {
        let mut env = self.config.variables.clone();
        if let Some(root) = &self.config.storage_root {
            env.insert(STORAGE_ROOT_VAR.to_string(), root.display().to_string());
        }
        env
    }
}
