//! Common module
//!
//! This module contains shared errors, logging setup and network helpers used throughout the application.

pub mod error;
pub mod log;
pub mod net;

// Re-export commonly used types and functions
pub use error::{ProxyError, Result};
pub use log::init_logger;
pub use net::{is_transient_accept_error, parse_socket_addr, split_host_port};
