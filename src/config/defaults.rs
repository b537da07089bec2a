//! Default configuration values
//!
//! Single source of truth for defaults, used by serde and by the command
//! line.

/// Environment variable prefix for all configuration options
pub const ENV_PREFIX: &str = "TLSMUX";

/// Default configuration file
pub const DEFAULT_CONFIG_FILE: &str = "/etc/tlsmux/config.json";

/// Default TLS listen address as string
pub const LISTEN_STR: &str = "0.0.0.0:443";

/// Default redirect listen address as string
pub const REDIRECT_LISTEN_STR: &str = "0.0.0.0:80";

/// Default log level as string
pub const LOG_LEVEL_STR: &str = "info";

/// The only backend protocol
pub const PROTOCOL_TCP: &str = "tcp";

/// Default TLS listen address
pub fn listen() -> String {
    LISTEN_STR.to_string()
}

/// Default redirect listen address
pub fn redirect_listen() -> String {
    REDIRECT_LISTEN_STR.to_string()
}

/// Default classification deadline in milliseconds
pub fn mux_timeout_ms() -> u64 {
    10_000
}

/// Default relay buffer size (8KB)
pub fn buffer_size() -> usize {
    8192
}

/// Default log level
pub fn log_level() -> String {
    LOG_LEVEL_STR.to_string()
}

/// Default backend protocol
pub fn protocol() -> String {
    PROTOCOL_TCP.to_string()
}

/// Default backend connect timeout in milliseconds
pub fn connect_timeout_ms() -> u64 {
    10_000
}
