//! Replaying connection
//!
//! Classifying a connection means reading its first bytes, yet whoever
//! handles the connection next (a TLS acceptor, or a backend behind the
//! relay) must see the stream from its very first byte. A
//! [`ReplayingConnection`] records everything read through its
//! [`recording`](ReplayingConnection::recording) view and serves those bytes
//! again, in order, before falling through to the socket.

use bytes::{Buf, BytesMut};
use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Initial replay buffer size, large enough for a typical ClientHello
const INITIAL_REPLAY_CAPACITY: usize = 1024;

/// A stream whose classified prefix is replayed to the next reader
#[derive(Debug)]
pub struct ReplayingConnection<S> {
    inner: S,
    replay: BytesMut,
}

impl<S> ReplayingConnection<S> {
    /// Wrap a freshly accepted stream
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            replay: BytesMut::with_capacity(INITIAL_REPLAY_CAPACITY),
        }
    }

    /// A reader that copies every byte it returns into the replay buffer
    pub fn recording(&mut self) -> Recording<'_, S> {
        Recording { conn: self }
    }

    /// Bytes that will be replayed before the socket is read again
    pub fn buffered(&self) -> &[u8] {
        &self.replay
    }

    /// The wrapped stream
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Split into the wrapped stream and the bytes not yet replayed
    pub fn into_parts(self) -> (S, BytesMut) {
        (self.inner, self.replay)
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for ReplayingConnection<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if !this.replay.is_empty() {
            let n = this.replay.len().min(buf.remaining());
            buf.put_slice(&this.replay[..n]);
            this.replay.advance(n);
            return Poll::Ready(Ok(()));
        }
        Pin::new(&mut this.inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for ReplayingConnection<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write(cx, buf)
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

/// Tee view over a [`ReplayingConnection`]
///
/// Reads go straight to the wrapped stream; whatever they return is also
/// appended to the replay buffer.
#[derive(Debug)]
pub struct Recording<'a, S> {
    conn: &'a mut ReplayingConnection<S>,
}

impl<S: AsyncRead + Unpin> AsyncRead for Recording<'_, S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let conn = &mut *self.get_mut().conn;
        let before = buf.filled().len();
        ready!(Pin::new(&mut conn.inner).poll_read(cx, buf))?;
        conn.replay.extend_from_slice(&buf.filled()[before..]);
        Poll::Ready(Ok(()))
    }
}
