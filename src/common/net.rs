//! Network utility functions
//!
//! This module provides utility functions for network operations.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::str::FromStr;

use super::error::{ProxyError, Result};

/// Parse a socket address
///
/// Accepts `ip:port`, `host:port` (resolved) and the `:port` shorthand,
/// which binds every IPv4 interface.
///
/// # Arguments
///
/// * `addr` - The address string to parse
///
/// # Returns
///
/// The parsed `SocketAddr`
pub fn parse_socket_addr(addr: &str) -> Result<SocketAddr> {
    let expanded;
    let addr = if addr.starts_with(':') {
        expanded = format!("0.0.0.0{}", addr);
        expanded.as_str()
    } else {
        addr
    };

    // Try direct parsing first
    if let Ok(socket_addr) = SocketAddr::from_str(addr) {
        return Ok(socket_addr);
    }

    // Try using ToSocketAddrs trait
    match addr.to_socket_addrs() {
        Ok(mut addrs) => {
            if let Some(addr) = addrs.next() {
                Ok(addr)
            } else {
                Err(ProxyError::Config(format!("Failed to parse address: {}", addr)))
            }
        }
        Err(e) => Err(ProxyError::Config(format!("Failed to parse address {}: {}", addr, e))),
    }
}

/// Split `host:port` into its parts
///
/// Bracketed IPv6 literals (`[::1]:443`) are supported. Returns `None` when
/// `name` carries no port, or when an unbracketed host contains a colon.
pub fn split_host_port(name: &str) -> Option<(&str, &str)> {
    if let Some(rest) = name.strip_prefix('[') {
        let (host, tail) = rest.split_once(']')?;
        let port = tail.strip_prefix(':')?;
        return Some((host, port));
    }

    let (host, port) = name.rsplit_once(':')?;
    if host.contains(':') {
        return None;
    }
    Some((host, port))
}

/// Default classifier for accept errors that are worth retrying
///
/// Per-connection failures (the peer reset before we accepted it) and file
/// descriptor exhaustion are transient; anything else means the listening
/// socket itself is unusable.
pub fn is_transient_accept_error(err: &io::Error) -> bool {
    match err.kind() {
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::Interrupted
        | io::ErrorKind::WouldBlock
        | io::ErrorKind::TimedOut => true,
        // ENFILE / EMFILE
        _ => matches!(err.raw_os_error(), Some(23) | Some(24)),
    }
}
