//! tlsmux: SNI based TLS multiplexer
//!
//! tlsmux listens on one TLS port and routes every incoming connection by the
//! server name in its ClientHello, without decrypting anything. Each virtual
//! host (a *frontend*) forwards to a round-robin set of backends, either
//! passing the TLS stream through untouched or terminating TLS with its own
//! certificate first. Connections for unknown names can fall back to a
//! default frontend.
//!
//! # Main Features
//!
//! - ClientHello parsing across fragmented TLS records
//! - Exact and `*.` wildcard virtual host names
//! - TLS passthrough or termination per frontend
//! - Optional plain-HTTP to HTTPS redirect server
//!
//! # Example
//!
//! ```no_run
//! use tlsmux::{parse_config, Result, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = parse_config(r#"{
//!         "listen": ":8443",
//!         "frontends": [
//!             { "name": "db.example.com", "backends": [ { "address": "10.0.0.5:5432" } ] }
//!         ]
//!     }"#)?;
//!
//!     let server = Server::bind(&config).await?;
//!     server.run().await
//! }
//! ```

// Public modules
pub mod common;
pub mod config;
pub mod mux;
pub mod protocol;
pub mod proxy;
pub mod tls;

// Re-export commonly used structures and functions for convenience
pub use common::{init_logger, parse_socket_addr, ProxyError, Result};
pub use config::{load_config, parse_config, Configuration};
pub use mux::{Listener, MuxError, MuxErrorKind, MuxedConn, Muxer, TlsMuxer};
pub use proxy::Server;
pub use tls::create_tls_acceptor;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
