//! Configuration module
//!
//! The configuration is a JSON document naming the TLS listen address and a
//! list of frontends. Each frontend is a virtual host name with an ordered
//! list of backends and, optionally, certificate material for terminating
//! TLS in front of them.
//!
//! Loading is layered: the file first, then `TLSMUX_*` environment variables
//! for top-level settings, then whatever the command line overrides. Values
//! are validated once; everything downstream treats them as immutable.

pub mod defaults;
mod error;
mod loader;
mod validator;

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::common::{parse_socket_addr, split_host_port, Result as ProxyResult};

pub use error::{ConfigError, Result};
pub use loader::{load_config, parse_config};
pub use validator::validate_config;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// TLS listen address, `:port` binds every IPv4 interface
    pub listen: String,
    /// Serve plain-HTTP redirects to HTTPS
    pub redirect: bool,
    /// Listen address of the redirect server
    pub redirect_listen: String,
    /// Deadline for reading the ClientHello, in milliseconds
    pub mux_timeout_ms: u64,
    /// Relay buffer size per direction
    pub buffer_size: usize,
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
    /// Virtual hosts
    pub frontends: Vec<FrontendConfig>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            listen: defaults::listen(),
            redirect: false,
            redirect_listen: defaults::redirect_listen(),
            mux_timeout_ms: defaults::mux_timeout_ms(),
            buffer_size: defaults::buffer_size(),
            log_level: defaults::log_level(),
            frontends: Vec::new(),
        }
    }
}

impl Configuration {
    /// Parsed TLS listen address
    pub fn listen_addr(&self) -> ProxyResult<SocketAddr> {
        parse_socket_addr(&self.listen)
    }

    /// Parsed redirect listen address
    pub fn redirect_addr(&self) -> ProxyResult<SocketAddr> {
        parse_socket_addr(&self.redirect_listen)
    }

    pub fn mux_timeout(&self) -> Duration {
        Duration::from_millis(self.mux_timeout_ms)
    }

    /// The frontend that receives connections no other frontend matched
    pub fn default_frontend(&self) -> Option<&FrontendConfig> {
        self.frontends.iter().find(|f| f.default)
    }
}

/// Backend selection policy of a frontend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    RoundRobin,
}

/// One virtual host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontendConfig {
    /// Host name, optionally `*.`-prefixed and/or with a `:port` suffix
    pub name: String,
    #[serde(default)]
    pub strategy: StrategyKind,
    /// PEM certificate chain; when set together with `tls_key` TLS is
    /// terminated here
    #[serde(default)]
    pub tls_cert: Option<PathBuf>,
    /// PEM private key
    #[serde(default)]
    pub tls_key: Option<PathBuf>,
    /// Receives connections whose host matches no frontend
    #[serde(default)]
    pub default: bool,
    pub backends: Vec<BackendConfig>,
}

impl FrontendConfig {
    /// Lowercased name without any port, as registered with the muxer
    pub fn host(&self) -> String {
        let host = split_host_port(&self.name).map_or(self.name.as_str(), |(host, _)| host);
        host.to_ascii_lowercase()
    }

    /// Certificate and key paths when TLS is terminated
    pub fn tls_material(&self) -> Option<(&Path, &Path)> {
        match (&self.tls_cert, &self.tls_key) {
            (Some(cert), Some(key)) => Some((cert.as_path(), key.as_path())),
            _ => None,
        }
    }
}

/// One backend of a frontend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// `host:port` to dial
    pub address: String,
    #[serde(default = "defaults::protocol")]
    pub protocol: String,
    /// Dial timeout in milliseconds; 0 means the default
    #[serde(default = "defaults::connect_timeout_ms")]
    pub connect_timeout: u64,
}

impl BackendConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            protocol: defaults::protocol(),
            connect_timeout: defaults::connect_timeout_ms(),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        match self.connect_timeout {
            0 => Duration::from_millis(defaults::connect_timeout_ms()),
            ms => Duration::from_millis(ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Configuration::default();
        assert_eq!(config.listen_addr().unwrap().port(), 443);
        assert_eq!(config.redirect_addr().unwrap().port(), 80);
        assert_eq!(config.mux_timeout(), Duration::from_secs(10));
        assert_eq!(config.buffer_size, 8192);
        assert!(config.default_frontend().is_none());
    }

    #[test]
    fn test_frontend_host_strips_port_and_case() {
        let frontend = FrontendConfig {
            name: "*.Example.com:443".to_string(),
            strategy: StrategyKind::RoundRobin,
            tls_cert: None,
            tls_key: Some("key.pem".into()),
            default: false,
            backends: vec![BackendConfig::new("127.0.0.1:8443")],
        };
        assert_eq!(frontend.host(), "*.example.com");
        assert!(frontend.tls_material().is_none());
    }

    #[test]
    fn test_backend_timeout_falls_back_to_default() {
        let mut backend = BackendConfig::new("127.0.0.1:1");
        backend.connect_timeout = 0;
        assert_eq!(backend.connect_timeout(), Duration::from_secs(10));
        backend.connect_timeout = 250;
        assert_eq!(backend.connect_timeout(), Duration::from_millis(250));
    }
}
