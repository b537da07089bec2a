//! Shared helpers for the integration tests

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use tlsmux::mux::MuxCloser;
use tlsmux::{parse_config, Server};

#[path = "../../src/tls/testing.rs"]
mod certs;

pub use certs::write_self_signed;

/// Upper bound for any single step of a test
pub const STEP: Duration = Duration::from_secs(5);

/// A minimal TLS 1.2 ClientHello record carrying `host` as its SNI
pub fn client_hello(host: &str) -> Vec<u8> {
    let mut sni = Vec::new();
    sni.push(0u8);
    sni.extend_from_slice(&(host.len() as u16).to_be_bytes());
    sni.extend_from_slice(host.as_bytes());
    let mut sni_ext = (sni.len() as u16).to_be_bytes().to_vec();
    sni_ext.extend_from_slice(&sni);

    let mut extensions = vec![0x00, 0x00];
    extensions.extend_from_slice(&(sni_ext.len() as u16).to_be_bytes());
    extensions.extend_from_slice(&sni_ext);

    let mut body = vec![0x03, 0x03];
    body.extend_from_slice(&[0x42; 32]);
    body.push(0);
    body.extend_from_slice(&[0x00, 0x02, 0x00, 0x2f]);
    body.extend_from_slice(&[0x01, 0x00]);
    body.extend_from_slice(&(extensions.len() as u16).to_be_bytes());
    body.extend_from_slice(&extensions);

    let mut handshake = vec![0x01];
    handshake.extend_from_slice(&(body.len() as u32).to_be_bytes()[1..]);
    handshake.extend_from_slice(&body);

    let mut record = vec![0x16, 0x03, 0x01];
    record.extend_from_slice(&(handshake.len() as u16).to_be_bytes());
    record.extend_from_slice(&handshake);
    record
}

/// Backend that writes `tag` on every connection, then echoes what it reads
pub async fn tagged_echo_backend(tag: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                if stream.write_all(tag.as_bytes()).await.is_err() {
                    return;
                }
                let (mut reader, mut writer) = stream.split();
                let _ = tokio::io::copy(&mut reader, &mut writer).await;
            });
        }
    });
    addr
}

/// An address nothing listens on
pub async fn dead_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// A server running in the background
pub struct Running {
    pub addr: SocketAddr,
    pub redirect: Option<SocketAddr>,
    pub shutdown: MuxCloser,
    pub task: JoinHandle<tlsmux::Result<()>>,
}

/// Bind a server for `config` and run it in the background
pub async fn start_server(config: serde_json::Value) -> Running {
    let config = parse_config(&config.to_string()).unwrap();
    let server = Server::bind(&config).await.unwrap();
    Running {
        addr: server.local_addr(),
        redirect: server.redirect_addr(),
        shutdown: server.shutdown_handle(),
        task: tokio::spawn(server.run()),
    }
}

/// Send a ClientHello for `host` followed by `payload` and read back the
/// backend's `tag` plus the echoed bytes
pub async fn round_trip(proxy: SocketAddr, host: &str, tag: &str, payload: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(proxy).await.unwrap();
    let mut sent = client_hello(host);
    sent.extend_from_slice(payload);
    stream.write_all(&sent).await.unwrap();

    let mut received = vec![0u8; tag.len() + sent.len()];
    tokio::time::timeout(STEP, stream.read_exact(&mut received))
        .await
        .expect("timed out waiting for the backend")
        .unwrap();

    assert_eq!(&received[tag.len()..], &sent[..], "backend did not see the replayed bytes");
    received.truncate(tag.len());
    received
}

/// Read until EOF and return what arrived
pub async fn read_to_eof(stream: &mut TcpStream) -> Vec<u8> {
    let mut buf = Vec::new();
    let _ = tokio::time::timeout(STEP, stream.read_to_end(&mut buf))
        .await
        .expect("connection was not closed");
    buf
}
