pub mod discover;
pub mod plan;
pub mod submit;
pub mod version;

use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use xsub_core::ExecutionContext;
use xsub_exp::{load_catalog, Catalog, CatalogStore};

use crate::config::{load_config, XsubConfig};

/// Arguments identifying a batch and the context it is submitted under.
#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    /// Batch identifier, used as the analysis version (e.g. `beta-v2.0`).
    #[arg(long)]
    pub batch: String,
    /// Container image the analyses run in.
    #[arg(long)]
    pub container: Option<String>,
    /// Campaign level execution version.
    #[arg(long = "execution-version")]
    pub execution_version: Option<String>,
    /// Catalog file; overrides the lookup of `<catalog-dir>/<batch>.yaml`.
    #[arg(long, conflicts_with = "catalog_dir")]
    pub catalog: Option<PathBuf>,
    /// Directory holding one catalog per batch.
    #[arg(long = "catalog-dir")]
    pub catalog_dir: Option<PathBuf>,
    /// YAML configuration file (falls back to `XSUB_CONFIG`).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Everything a batch command needs, resolved in setup order.
pub struct BatchSetup {
    pub config: XsubConfig,
    pub context: ExecutionContext,
    pub catalog: Catalog,
}

impl BatchArgs {
    /// Loads config, builds the execution context, then loads the catalog.
    pub fn resolve(&self) -> Result<BatchSetup, Box<dyn Error>> {
        let config = load_config(self.config.as_deref())?;
        let container = self
            .container
            .clone()
            .or_else(|| config.container.clone())
            .ok_or("no container given; pass --container or set `container` in the config")?;
        let execution_version = self
            .execution_version
            .clone()
            .or_else(|| config.execution_version.clone())
            .ok_or(
                "no execution version given; pass --execution-version or set `execution_version` in the config",
            )?;
        let context = ExecutionContext::new(container, execution_version, self.batch.clone())?;
        let catalog = self.load_catalog(&config)?;
        Ok(BatchSetup {
            config,
            context,
            catalog,
        })
    }

    fn load_catalog(&self, config: &XsubConfig) -> Result<Catalog, Box<dyn Error>> {
        if let Some(path) = &self.catalog {
            let catalog = load_catalog(path)?;
            catalog.check_batch(&self.batch)?;
            return Ok(catalog);
        }
        let root = self
            .catalog_dir
            .clone()
            .or_else(|| config.catalog_dir.clone())
            .unwrap_or_else(|| PathBuf::from("catalogs"));
        Ok(CatalogStore::new(root).load(&self.batch)?)
    }
}
