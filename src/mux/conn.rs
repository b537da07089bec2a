//! Classified connections

use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;

use super::replay::ReplayingConnection;

/// A byte stream that knows which virtual host it was routed by
pub trait RoutedConn: AsyncRead + AsyncWrite + Unpin + Send + 'static {
    /// The normalized host name the connection asked for
    fn host(&self) -> &str;
}

/// A connection handed out by the muxer
///
/// Reading starts again from the first byte the client sent, including the
/// bytes consumed while classifying it.
#[derive(Debug)]
pub struct MuxedConn {
    conn: ReplayingConnection<TcpStream>,
    host: String,
    peer_addr: SocketAddr,
}

impl MuxedConn {
    pub(crate) fn new(conn: ReplayingConnection<TcpStream>, host: String, peer_addr: SocketAddr) -> Self {
        Self { conn, host, peer_addr }
    }

    /// Normalized host name, empty if none could be determined
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Remote address of the client
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
}

impl RoutedConn for MuxedConn {
    fn host(&self) -> &str {
        &self.host
    }
}

impl AsyncRead for MuxedConn {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().conn).poll_read(cx, buf)
    }
}

impl AsyncWrite for MuxedConn {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().conn).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().conn).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().conn).poll_shutdown(cx)
    }
}
