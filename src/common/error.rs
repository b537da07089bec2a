//! Error handling module
//!
//! This module defines the error types and result type aliases used in the application.

use thiserror::Error;
use std::io;

/// tlsmux error type
#[derive(Error, Debug)]
pub enum ProxyError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// OpenSSL error
    #[error("OpenSSL error: {0}")]
    Ssl(#[from] openssl::error::ErrorStack),

    /// TLS handshake error
    #[error("TLS handshake error: {0}")]
    TlsHandshake(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A virtual host name is already registered with the muxer
    #[error("name {0} is already bound")]
    AlreadyBound(String),

    /// The virtual host listener was closed
    #[error("listener closed")]
    ListenerClosed,

    /// The muxer has stopped and takes no new listeners
    #[error("muxer closed")]
    MuxerClosed,

    /// Connecting to a backend failed
    #[error("failed to dial backend {address}: {source}")]
    Dial {
        /// Backend address
        address: String,
        /// Underlying cause
        #[source]
        source: io::Error,
    },

    /// Other error
    #[error("Other error: {0}")]
    Other(String),
}

/// Result type alias
///
/// This is a `Result` type alias that uses our custom `ProxyError`.
pub type Result<T> = std::result::Result<T, ProxyError>;
