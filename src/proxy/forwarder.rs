//! Data forwarding module
//!
//! This module copies bytes in both directions between a client and a
//! backend until either side is done.

use log::debug;
use metrics::counter;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Bytes moved by one relay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub client_to_backend: u64,
    pub backend_to_client: u64,
}

/// Relay bytes between `client` and `backend`
///
/// Each direction runs in its own task. When one direction ends, on EOF or
/// error, it shuts down the stream it was writing to and the other direction
/// is stopped, which releases both connections. Returns once both directions
/// have finished.
///
/// # Parameters
///
/// * `client` - Client side stream
/// * `backend` - Backend side stream
/// * `buffer_size` - Copy buffer size per direction
///
/// # Returns
///
/// Byte counts for both directions. Copy errors are logged, not returned.
pub async fn join_connections<C, B>(client: C, backend: B, buffer_size: usize) -> RelayStats
where
    C: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    B: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (client_reader, client_writer) = tokio::io::split(client);
    let (backend_reader, backend_writer) = tokio::io::split(backend);

    let upstream = Arc::new(AtomicU64::new(0));
    let downstream = Arc::new(AtomicU64::new(0));

    let mut client_to_backend = tokio::spawn(copy_direction(
        client_reader,
        backend_writer,
        buffer_size,
        Arc::clone(&upstream),
        "client_to_backend",
    ));
    let mut backend_to_client = tokio::spawn(copy_direction(
        backend_reader,
        client_writer,
        buffer_size,
        Arc::clone(&downstream),
        "backend_to_client",
    ));

    // Whichever side finishes first tears down the other
    let (finished, result, other) = tokio::select! {
        result = &mut client_to_backend => ("client_to_backend", result, backend_to_client),
        result = &mut backend_to_client => ("backend_to_client", result, client_to_backend),
    };
    match result {
        Ok(Ok(())) => debug!("{} reached EOF", finished),
        Ok(Err(e)) => debug!("{} ended with error: {}", finished, e),
        Err(e) => debug!("{} task failed: {}", finished, e),
    }
    other.abort();
    let _ = other.await;

    let stats = RelayStats {
        client_to_backend: upstream.load(Ordering::Relaxed),
        backend_to_client: downstream.load(Ordering::Relaxed),
    };
    debug!(
        "Relay finished: {} bytes client to backend, {} bytes backend to client",
        stats.client_to_backend, stats.backend_to_client
    );
    stats
}

async fn copy_direction<R, W>(
    mut reader: R,
    mut writer: W,
    buffer_size: usize,
    copied: Arc<AtomicU64>,
    direction: &'static str,
) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buffer = vec![0u8; buffer_size.max(1)];

    let result = loop {
        let n = match reader.read(&mut buffer).await {
            Ok(0) => break Ok(()), // Connection closed
            Ok(n) => n,
            Err(e) => break Err(e),
        };
        if let Err(e) = writer.write_all(&buffer[..n]).await {
            break Err(e);
        }
        copied.fetch_add(n as u64, Ordering::Relaxed);
        counter!("tlsmux_relay_bytes_total", "direction" => direction).increment(n as u64);
    };

    let _ = writer.shutdown().await;
    result
}
