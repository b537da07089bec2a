//! Virtual host multiplexing
//!
//! Shares one listening socket between many virtual hosts. Connections are
//! classified by a [`HostExtractor`] and handed to the [`Listener`]
//! registered for the host, exact names first, then `*.` wildcards from the
//! most specific suffix down. [`TlsMuxer`] classifies by TLS SNI.

mod conn;
mod error;
mod listener;
mod muxer;
mod registry;
mod replay;
mod tls;

pub use conn::{MuxedConn, RoutedConn};
pub use error::{MuxError, MuxErrorKind};
pub use listener::Listener;
pub use muxer::{normalize_host, HostExtractor, MuxCloser, MuxOptions, Muxer, DEFAULT_MUX_TIMEOUT};
pub use replay::{Recording, ReplayingConnection};
pub use tls::{SniExtractor, TlsMuxer};
