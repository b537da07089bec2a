//! Connection handler module
//!
//! This module relays a single routed client connection to a backend.

use log::{debug, warn};
use metrics::counter;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use super::forwarder::{join_connections, RelayStats};
use super::frontend::Frontend;
use crate::common::{ProxyError, Result};
use crate::config::BackendConfig;
use crate::mux::RoutedConn;
use crate::tls::accept_tls;

/// Handle a single client connection
///
/// Terminates TLS first if the frontend carries certificate material,
/// otherwise the stream is relayed as is (replayed ClientHello included).
/// The backend is picked by the frontend's strategy and dialled once.
///
/// # Parameters
///
/// * `client` - Routed client connection
/// * `frontend` - Frontend the connection was routed to
/// * `buffer_size` - Relay buffer size per direction
///
/// # Returns
///
/// Returns the relay's byte counts. A failed TLS handshake or backend dial
/// closes the client connection and returns an error; no other backend is
/// tried.
pub async fn handle_connection<C>(client: C, frontend: &Frontend, buffer_size: usize) -> Result<RelayStats>
where
    C: RoutedConn,
{
    debug!("Handling connection for {:?} on frontend {}", client.host(), frontend.name());

    match frontend.acceptor() {
        Some(acceptor) => {
            let stream = accept_tls(acceptor, client).await?;
            relay(stream, frontend, buffer_size).await
        }
        None => relay(client, frontend, buffer_size).await,
    }
}

async fn relay<S>(mut client: S, frontend: &Frontend, buffer_size: usize) -> Result<RelayStats>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let backend = frontend.strategy().next_backend();

    let target = match dial(backend).await {
        Ok(target) => target,
        Err(e) => {
            warn!("Frontend {}: {}", frontend.name(), e);
            counter!("tlsmux_backend_dial_failures_total", "frontend" => frontend.name().to_string())
                .increment(1);
            let _ = client.shutdown().await;
            return Err(e);
        }
    };

    debug!("Frontend {} connected to backend {}", frontend.name(), backend.address);
    Ok(join_connections(client, target, buffer_size).await)
}

/// Connect to `backend` within its connect timeout
async fn dial(backend: &BackendConfig) -> Result<TcpStream> {
    let connect = TcpStream::connect(backend.address.as_str());
    let result = match timeout(backend.connect_timeout(), connect).await {
        Ok(result) => result,
        Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "Connection timed out")),
    };

    result.map_err(|source| ProxyError::Dial {
        address: backend.address.clone(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackendConfig, StrategyKind};
    use crate::proxy::strategy::build_strategy;
    use crate::tls::create_tls_acceptor;
    use crate::tls::testing::write_self_signed;
    use openssl::ssl::{SslConnector, SslMethod, SslVerifyMode};
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, DuplexStream, ReadBuf};
    use tokio::net::TcpListener;
    use tokio_openssl::SslStream;

    /// In-memory client connection
    struct TestConn(DuplexStream);

    impl RoutedConn for TestConn {
        fn host(&self) -> &str {
            "test.example.com"
        }
    }

    impl AsyncRead for TestConn {
        fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
            Pin::new(&mut self.get_mut().0).poll_read(cx, buf)
        }
    }

    impl AsyncWrite for TestConn {
        fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
            Pin::new(&mut self.get_mut().0).poll_write(cx, buf)
        }

        fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Pin::new(&mut self.get_mut().0).poll_flush(cx)
        }

        fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Pin::new(&mut self.get_mut().0).poll_shutdown(cx)
        }
    }

    /// Echo server that handles one connection
    async fn echo_backend() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        (listener, address)
    }

    fn serve_echo(listener: TcpListener) {
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let (mut rd, mut wr) = stream.split();
            let _ = tokio::io::copy(&mut rd, &mut wr).await;
        });
    }

    async fn dead_address() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().to_string()
    }

    fn frontend(addresses: &[&str], acceptor: Option<openssl::ssl::SslAcceptor>) -> Frontend {
        let backends = addresses.iter().map(|a| BackendConfig::new(*a)).collect();
        let strategy = build_strategy(StrategyKind::RoundRobin, backends).unwrap();
        Frontend::new("test.example.com", strategy, acceptor)
    }

    #[tokio::test]
    async fn test_plain_relay() {
        let (listener, address) = echo_backend().await;
        serve_echo(listener);
        let frontend = frontend(&[&address], None);

        let (mut client, server) = tokio::io::duplex(1024);
        let relay = tokio::spawn(async move { handle_connection(TestConn(server), &frontend, 1024).await });

        client.write_all(b"hello backend").await.unwrap();
        let mut echoed = [0u8; 13];
        client.read_exact(&mut echoed).await.unwrap();
        assert_eq!(&echoed, b"hello backend");

        drop(client);
        let stats = tokio::time::timeout(Duration::from_secs(5), relay)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(stats.client_to_backend, 13);
    }

    #[tokio::test]
    async fn test_dial_failure_closes_client_without_retry() {
        let (alive, alive_address) = echo_backend().await;
        let dead = dead_address().await;
        // round robin starts at the second entry
        let frontend = frontend(&[&alive_address, &dead], None);

        let (mut client, server) = tokio::io::duplex(1024);
        let err = handle_connection(TestConn(server), &frontend, 1024).await.unwrap_err();
        match err {
            ProxyError::Dial { address, .. } => assert_eq!(address, dead),
            other => panic!("expected dial error, got {:?}", other),
        }

        let mut rest = Vec::new();
        assert_eq!(client.read_to_end(&mut rest).await.unwrap(), 0);

        let second_try = tokio::time::timeout(Duration::from_millis(200), alive.accept()).await;
        assert!(second_try.is_err(), "no connection should reach the other backend");
    }

    #[tokio::test]
    async fn test_terminates_tls() {
        let dir = tempfile::tempdir().unwrap();
        let (cert, key) = write_self_signed(dir.path(), "test.example.com");
        let acceptor = create_tls_acceptor(&cert, &key).unwrap();

        let (listener, address) = echo_backend().await;
        let backend = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut plain = [0u8; 9];
            stream.read_exact(&mut plain).await.unwrap();
            stream.write_all(&plain).await.unwrap();
            plain
        });
        let frontend = frontend(&[&address], Some(acceptor));

        let (client, server) = tokio::io::duplex(16 * 1024);
        tokio::spawn(async move { handle_connection(TestConn(server), &frontend, 1024).await });

        let mut connector = SslConnector::builder(SslMethod::tls()).unwrap();
        connector.set_verify(SslVerifyMode::NONE);
        let ssl = connector.build().configure().unwrap().into_ssl("test.example.com").unwrap();
        let mut tls = Box::pin(SslStream::new(ssl, client).unwrap());
        tls.as_mut().connect().await.unwrap();

        tls.write_all(b"plaintext").await.unwrap();
        let mut echoed = [0u8; 9];
        tls.read_exact(&mut echoed).await.unwrap();

        assert_eq!(&echoed, b"plaintext");
        assert_eq!(&backend.await.unwrap(), b"plaintext");
    }
}
