use std::env;
use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

/// Filter directives read before falling back to `RUST_LOG`.
pub const LOG_ENV: &str = "XSUB_LOG";

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Installs the stderr subscriber once; stdout stays reserved for command output.
pub fn init_logging(verbose: u8, json: bool) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let default_level = match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        let filter = env::var(LOG_ENV)
            .ok()
            .and_then(|spec| EnvFilter::try_new(spec).ok())
            .or_else(|| EnvFilter::try_from_default_env().ok())
            .unwrap_or_else(|| EnvFilter::new(default_level));

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false);
        let installed = if json {
            builder.json().try_init()
        } else {
            builder.try_init()
        };
        if installed.is_err() {
            tracing::debug!("global tracing subscriber already installed");
        }
    });
}
