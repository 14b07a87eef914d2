use std::env;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use xsub_core::from_yaml_slice;
use xsub_exp::{EnvironmentConfig, Scheduler, DEFAULT_PROGRAM};

/// Variable naming a configuration file when `--config` is absent.
pub const CONFIG_ENV: &str = "XSUB_CONFIG";

/// Contents of `xsub.yaml`. Every section is optional; CLI flags win.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct XsubConfig {
    #[serde(default)]
    pub container: Option<String>,
    #[serde(default)]
    pub execution_version: Option<String>,
    #[serde(default)]
    pub catalog_dir: Option<PathBuf>,
    #[serde(default)]
    pub ledger: Option<PathBuf>,
    /// Extra attempts per job after the first failure.
    #[serde(default)]
    pub retries: u32,
    #[serde(default)]
    pub environment: EnvironmentConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub scheduler: Scheduler,
}

/// External submit program and its fixed leading arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_stderr_tail")]
    pub stderr_tail: usize,
}

fn default_program() -> String {
    DEFAULT_PROGRAM.to_string()
}

fn default_stderr_tail() -> usize {
    20
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: Vec::new(),
            stderr_tail: default_stderr_tail(),
        }
    }
}

/// Loads the explicit config file, the one named by `XSUB_CONFIG`, or defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<XsubConfig, Box<dyn Error>> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => env::var_os(CONFIG_ENV).map(PathBuf::from),
    };
    let Some(path) = path else {
        return Ok(XsubConfig::default());
    };
    let bytes = fs::read(&path)
        .map_err(|err| format!("failed to read config {}: {err}", path.display()))?;
    let mut config: XsubConfig = from_yaml_slice(&bytes)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    config.resolve_relative_paths(base);
    tracing::debug!(path = %path.display(), "loaded configuration");
    Ok(config)
}

impl XsubConfig {
    /// Anchors relative paths at the directory holding the config file.
    fn resolve_relative_paths(&mut self, base: &Path) {
        let anchor = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        if let Some(dir) = self.catalog_dir.as_mut() {
            anchor(dir);
        }
        if let Some(ledger) = self.ledger.as_mut() {
            anchor(ledger);
        }
        if let Some(root) = self.environment.storage_root.as_mut() {
            anchor(root);
        }
    }
}
