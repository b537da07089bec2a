//! Configuration validator
//!
//! This module provides functionality for validating configuration.

use log::warn;
use std::collections::HashSet;
use std::path::Path;

use super::defaults;
use super::error::{ConfigError, Result};
use super::{Configuration, FrontendConfig};
use crate::common::parse_socket_addr;

/// Validate the configuration
pub fn validate_config(config: &Configuration) -> Result<()> {
    // Validate network settings
    validate_network_settings(config)?;

    // Validate frontends
    validate_frontends(config)?;

    // Validate general settings
    validate_general_settings(config)?;

    Ok(())
}

/// Validate network settings
fn validate_network_settings(config: &Configuration) -> Result<()> {
    parse_socket_addr(&config.listen)
        .map_err(|e| ConfigError::InvalidValue("listen".to_string(), e.to_string()))?;

    if config.redirect {
        let redirect = parse_socket_addr(&config.redirect_listen)
            .map_err(|e| ConfigError::InvalidValue("redirect_listen".to_string(), e.to_string()))?;
        if Some(redirect) == parse_socket_addr(&config.listen).ok() {
            return Err(ConfigError::InvalidCombination(
                "Listen and redirect addresses must be different".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_frontends(config: &Configuration) -> Result<()> {
    if config.frontends.is_empty() {
        return Err(ConfigError::MissingRequiredValue("frontends".to_string()));
    }

    let mut hosts = HashSet::new();
    for frontend in &config.frontends {
        validate_frontend(frontend)?;
        if !hosts.insert(frontend.host()) {
            return Err(ConfigError::InvalidCombination(format!(
                "Frontend {} is defined more than once",
                frontend.host()
            )));
        }
    }

    let defaults: Vec<_> = config.frontends.iter().filter(|f| f.default).map(|f| f.name.as_str()).collect();
    if defaults.len() > 1 {
        return Err(ConfigError::InvalidCombination(format!(
            "Only one frontend may be the default, found {}",
            defaults.join(", ")
        )));
    }

    Ok(())
}

fn validate_frontend(frontend: &FrontendConfig) -> Result<()> {
    let field = |name: &str| format!("frontends[{}].{}", frontend.name, name);

    if frontend.name.trim().is_empty() {
        return Err(ConfigError::MissingRequiredValue("frontends[].name".to_string()));
    }

    if frontend.backends.is_empty() {
        return Err(ConfigError::MissingRequiredValue(field("backends")));
    }

    for backend in &frontend.backends {
        if backend.address.trim().is_empty() {
            return Err(ConfigError::MissingRequiredValue(field("backends[].address")));
        }
        if backend.protocol != defaults::PROTOCOL_TCP {
            return Err(ConfigError::InvalidValue(
                field("backends[].protocol"),
                format!("unsupported protocol {:?}, only \"tcp\" is supported", backend.protocol),
            ));
        }
    }

    match (&frontend.tls_cert, &frontend.tls_key) {
        (Some(cert), Some(key)) => {
            validate_file_exists(cert, &field("tls_cert"))?;
            validate_file_exists(key, &field("tls_key"))?;
        }
        (None, None) => {}
        _ => {
            return Err(ConfigError::InvalidCombination(format!(
                "{} requires both tls_cert and tls_key",
                frontend.name
            )));
        }
    }

    Ok(())
}

/// Validate general settings
fn validate_general_settings(config: &Configuration) -> Result<()> {
    // Validate log level
    match config.log_level.as_str() {
        "error" | "warn" | "info" | "debug" | "trace" => {}
        level => {
            warn!("Invalid log level: {}. Using default: info", level);
        }
    }

    // Validate buffer size
    if config.buffer_size == 0 {
        return Err(ConfigError::InvalidValue(
            "buffer_size".to_string(),
            "Buffer size must be greater than 0".to_string(),
        ));
    }

    // Validate classification deadline
    if config.mux_timeout_ms == 0 {
        return Err(ConfigError::InvalidValue(
            "mux_timeout_ms".to_string(),
            "Mux timeout must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Validate that a file exists
fn validate_file_exists(path: &Path, field: &str) -> Result<()> {
    if !path.is_file() {
        return Err(ConfigError::InvalidValue(
            field.to_string(),
            format!("file does not exist: {}", path.display()),
        ));
    }

    Ok(())
}
