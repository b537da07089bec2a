//! Proxy service module
//!
//! This module relays routed connections to backends: per-frontend backend
//! selection, optional TLS termination, the byte relay itself and the server
//! that ties frontends to the TLS muxer.

mod forwarder;
mod frontend;
mod handler;
pub mod redirect;
pub mod server;
pub mod strategy;

pub use forwarder::{join_connections, RelayStats};
pub use frontend::Frontend;
pub use handler::handle_connection;
pub use server::Server;
pub use strategy::{build_strategy, BackendStrategy, RoundRobin};
