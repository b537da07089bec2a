//! Configuration loader implementation
//!
//! Builds a [`Configuration`] from a JSON file layered with environment
//! variables, using the `config` crate:
//!
//! 1. Default values (serde defaults, lowest priority)
//! 2. The JSON configuration file
//! 3. `TLSMUX_*` environment variables, e.g. `TLSMUX_LISTEN=:8443` or
//!    `TLSMUX_MUX_TIMEOUT_MS=5000`
//!
//! The result is validated before it is returned.

use ::config::{Config, Environment, File, FileFormat, Map};
use log::{debug, info};
use std::path::Path;

use super::defaults;
use super::error::{ConfigError, Result};
use super::validator::validate_config;
use super::Configuration;

/// Load and validate the configuration file at `path`
///
/// # Errors
///
/// Returns [`ConfigError::FileNotFound`] if `path` does not exist, and a
/// load or validation error if the document is unusable.
pub fn load_config(path: &Path) -> Result<Configuration> {
    load_with_environment(path, None)
}

/// Parse and validate a JSON document, without environment overrides
pub fn parse_config(json: &str) -> Result<Configuration> {
    let configuration: Configuration = Config::builder()
        .add_source(File::from_str(json, FileFormat::Json))
        .build()?
        .try_deserialize()?;

    validate_config(&configuration)?;
    Ok(configuration)
}

fn load_with_environment(path: &Path, env: Option<Map<String, String>>) -> Result<Configuration> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }

    let configuration: Configuration = Config::builder()
        .add_source(File::from(path.to_path_buf()).format(FileFormat::Json))
        .add_source(environment().source(env))
        .build()?
        .try_deserialize()?;

    debug!("Configuration loaded from {}: {:?}", path.display(), configuration);
    validate_config(&configuration)?;
    info!(
        "Loaded {} frontend(s) from {}",
        configuration.frontends.len(),
        path.display()
    );
    Ok(configuration)
}

fn environment() -> Environment {
    Environment::with_prefix(defaults::ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
