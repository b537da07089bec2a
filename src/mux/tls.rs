//! TLS virtual host muxing
//!
//! Routes on the server name indication of the ClientHello. The handshake is
//! only read, never answered, so a listener can either terminate TLS itself
//! or pass the untouched stream to a backend.

use log::trace;
use std::future::Future;
use std::ops::Deref;
use tokio::net::{TcpListener, TcpStream};

use super::listener::Listener;
use super::muxer::{HostExtractor, MuxOptions, Muxer};
use super::replay::ReplayingConnection;
use crate::common::{split_host_port, Result};
use crate::protocol::{read_client_hello, ProtocolError};

/// Extracts the SNI host name from a ClientHello
///
/// A ClientHello without a `server_name` extension yields an empty host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SniExtractor;

impl HostExtractor for SniExtractor {
    fn extract<'a>(
        &'a self,
        conn: &'a mut ReplayingConnection<TcpStream>,
    ) -> impl Future<Output = std::result::Result<String, ProtocolError>> + Send + 'a {
        server_name(conn)
    }
}

async fn server_name(conn: &mut ReplayingConnection<TcpStream>) -> std::result::Result<String, ProtocolError> {
    let hello = read_client_hello(conn.recording()).await?;
    trace!(
        "ClientHello version={:#06x} suites={} sni={:?}",
        hello.version,
        hello.cipher_suites.len(),
        hello.server_name
    );
    Ok(hello.server_name)
}

/// A [`Muxer`] that routes TLS connections by SNI
///
/// Every other muxer operation is available through `Deref`.
pub struct TlsMuxer {
    inner: Muxer<SniExtractor>,
}

impl TlsMuxer {
    pub fn new(listener: TcpListener, options: MuxOptions) -> Result<Self> {
        Ok(Self {
            inner: Muxer::new(listener, SniExtractor, options)?,
        })
    }

    /// Register a listener for `name`, ignoring any `:port` suffix
    pub fn listen(&self, name: &str) -> Result<Listener> {
        let host = split_host_port(name).map_or(name, |(host, _)| host);
        self.inner.listen(host)
    }
}

impl Deref for TlsMuxer {
    type Target = Muxer<SniExtractor>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
