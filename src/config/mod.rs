//! Configuration management for the monitoring service.
//!
//! The service is started with a single JSON file describing the shared HTTP
//! client, logging, and every monitor to run. Missing fields fall back to
//! defaults; the parsed document is validated before it is returned.

pub mod schema;

pub use schema::{ClientSettings, LogFormat, ServiceConfig, UndeclaredPlaceholder};

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised while loading the service configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Reads, parses and validates the configuration file at `path`.
///
/// # Example
///
/// ```no_run
/// use http_monitor::config::load_config;
///
/// let config = load_config("monitors.json").unwrap();
/// println!("{} monitors configured", config.monitors.len());
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<ServiceConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let config = parse_config(&content)?;
    for undeclared in config.undeclared_placeholders() {
        warn!(
            monitor = %undeclared.monitor,
            request = %undeclared.request,
            placeholder = %undeclared.name,
            "placeholder does not match any variable and will be sent verbatim"
        );
    }
    debug!(
        path = %path.display(),
        monitors = config.monitors.len(),
        "configuration loaded"
    );
    Ok(config)
}

/// Parses and validates a configuration document.
pub fn parse_config(content: &str) -> Result<ServiceConfig, ConfigError> {
    let config: ServiceConfig = serde_json::from_str(content)?;
    config.validate()?;
    Ok(config)
}
