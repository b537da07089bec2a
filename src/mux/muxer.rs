//! Virtual host muxer
//!
//! A [`Muxer`] owns one listening socket. Every accepted connection gets its
//! own task, which extracts a host name under a deadline and hands the
//! connection to the [`Listener`] registered for that name. Anything that
//! cannot be routed, and the muxer's own shutdown, is reported through
//! [`Muxer::next_error`] together with the connection when there is one.

use futures::FutureExt;
use log::{debug, error, info, warn};
use metrics::counter;
use std::fmt;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex, Notify};

use super::conn::MuxedConn;
use super::error::{MuxError, MuxErrorKind};
use super::listener::{deliver, Delivery, Listener};
use super::registry::Registry;
use super::replay::ReplayingConnection;
use crate::common::{is_transient_accept_error, Result};
use crate::protocol::ProtocolError;

/// Default classification deadline
pub const DEFAULT_MUX_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors waiting for [`Muxer::next_error`]
const ERROR_QUEUE_CAPACITY: usize = 32;

/// Pause after a transient accept failure
const ACCEPT_BACKOFF: Duration = Duration::from_millis(5);

/// Protocol specific host name extraction
///
/// Implementations read from the connection through
/// [`ReplayingConnection::recording`] so the bytes they consume are replayed
/// to whoever accepts the connection.
pub trait HostExtractor: Send + Sync + 'static {
    /// Read enough of `conn` to name the requested virtual host
    fn extract<'a>(
        &'a self,
        conn: &'a mut ReplayingConnection<TcpStream>,
    ) -> impl Future<Output = std::result::Result<String, ProtocolError>> + Send + 'a;
}

/// Lowercase host names so lookups are case-insensitive
pub fn normalize_host(name: &str) -> String {
    name.to_ascii_lowercase()
}

/// Tunables for a [`Muxer`]
#[derive(Clone, Copy)]
pub struct MuxOptions {
    /// Deadline for extracting a host name from a new connection
    pub timeout: Duration,
    /// Applied to registered names and extracted hosts alike
    pub normalize: fn(&str) -> String,
    /// Accept errors for which the accept loop keeps going
    pub is_transient: fn(&io::Error) -> bool,
}

impl Default for MuxOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_MUX_TIMEOUT,
            normalize: normalize_host,
            is_transient: is_transient_accept_error,
        }
    }
}

impl fmt::Debug for MuxOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MuxOptions")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl MuxOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Stops a muxer's accept loop
#[derive(Debug, Clone)]
pub struct MuxCloser {
    notify: Arc<Notify>,
}

impl MuxCloser {
    /// Ask the muxer to stop; it reports [`MuxErrorKind::Closed`] once stopped
    pub fn close(&self) {
        self.notify.notify_one();
    }
}

/// State shared by the accept loop and the per-connection tasks
struct Shared<E> {
    extractor: E,
    registry: Arc<Registry<Delivery>>,
    errors: mpsc::Sender<MuxError>,
    options: MuxOptions,
}

/// Routes connections from one socket to per-host listeners
pub struct Muxer<E: HostExtractor> {
    shared: Arc<Shared<E>>,
    errors: Mutex<mpsc::Receiver<MuxError>>,
    closer: MuxCloser,
    local_addr: SocketAddr,
}

impl<E: HostExtractor> Muxer<E> {
    /// Start muxing connections accepted from `listener`
    ///
    /// Must be called from within a Tokio runtime; the accept loop runs as a
    /// background task until [`close`](Self::close) is called or the socket
    /// fails.
    pub fn new(listener: TcpListener, extractor: E, options: MuxOptions) -> Result<Self> {
        let local_addr = listener.local_addr()?;
        let (errors_tx, errors_rx) = mpsc::channel(ERROR_QUEUE_CAPACITY);
        let shared = Arc::new(Shared {
            extractor,
            registry: Arc::new(Registry::default()),
            errors: errors_tx,
            options,
        });
        let closer = MuxCloser {
            notify: Arc::new(Notify::new()),
        };

        tokio::spawn(run(listener, Arc::clone(&shared), closer.clone()));

        Ok(Self {
            shared,
            errors: Mutex::new(errors_rx),
            closer,
            local_addr,
        })
    }

    /// Register a listener for `name`
    ///
    /// `name` is normalized first. A leading `*.` makes it a wildcard that
    /// matches any host ending in the rest of the name.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::AlreadyBound`](crate::common::ProxyError::AlreadyBound)
    /// if the normalized name is taken; the existing listener is unaffected.
    /// Returns [`ProxyError::MuxerClosed`](crate::common::ProxyError::MuxerClosed)
    /// once the muxer has stopped.
    pub fn listen(&self, name: &str) -> Result<Listener> {
        let name = (self.shared.options.normalize)(name);
        let (tx, rx) = mpsc::channel(1);
        self.shared.registry.insert(name.clone(), tx)?;
        debug!(
            "Listening for {} on {} ({} names registered)",
            name,
            self.local_addr,
            self.shared.registry.len()
        );
        Ok(Listener::new(name, rx, Arc::clone(&self.shared.registry), self.local_addr))
    }

    /// Wait for the next routing failure or the muxer's shutdown
    pub async fn next_error(&self) -> MuxError {
        match self.errors.lock().await.recv().await {
            Some(err) => err,
            None => MuxError::new(MuxErrorKind::Closed("error stream ended".to_string()), None),
        }
    }

    /// Stop accepting connections
    pub fn close(&self) {
        self.closer.close();
    }

    /// A handle that closes this muxer from elsewhere
    pub fn closer(&self) -> MuxCloser {
        self.closer.clone()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl<E: HostExtractor> Drop for Muxer<E> {
    fn drop(&mut self) {
        self.closer.close();
    }
}

async fn run<E: HostExtractor>(listener: TcpListener, shared: Arc<Shared<E>>, closer: MuxCloser) {
    info!("Muxer accepting connections on {:?}", listener.local_addr().ok());

    let reason = loop {
        let accepted = tokio::select! {
            accepted = listener.accept() => accepted,
            _ = closer.notify.notified() => break "closed by request".to_string(),
        };

        match accepted {
            Ok((stream, peer_addr)) => {
                counter!("tlsmux_connections_accepted_total").increment(1);
                debug!("Accepted connection from {}", peer_addr);
                let shared = Arc::clone(&shared);
                tokio::spawn(async move {
                    shared.handle_guarded(stream, peer_addr).await;
                });
            }
            Err(e) if (shared.options.is_transient)(&e) => {
                warn!("Temporary error accepting connection: {}", e);
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
                break e.to_string();
            }
        }
    };

    drop(listener);
    // listeners see the end of their channels once in-flight handoffs finish
    shared.registry.close();
    info!("Muxer stopped: {}", reason);
    shared.report(MuxError::new(MuxErrorKind::Closed(reason), None)).await;
}

impl<E: HostExtractor> Shared<E> {
    /// Route one connection; panics are reported instead of unwinding further
    async fn handle_guarded(&self, stream: TcpStream, peer_addr: SocketAddr) {
        let outcome = AssertUnwindSafe(self.handle(stream, peer_addr))
            .catch_unwind()
            .await;

        if let Err(panic) = outcome {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!("Connection handler for {} panicked: {}", peer_addr, message);
            self.report(MuxError::new(MuxErrorKind::Internal(message), None)).await;
        }
    }

    async fn handle(&self, stream: TcpStream, peer_addr: SocketAddr) {
        let mut conn = ReplayingConnection::new(stream);

        let extracted = tokio::time::timeout(self.options.timeout, self.extractor.extract(&mut conn)).await;
        let host = match extracted {
            Ok(Ok(host)) => host,
            Ok(Err(e)) => {
                debug!("Could not extract host from {}: {}", peer_addr, e);
                let conn = MuxedConn::new(conn, String::new(), peer_addr);
                self.report(MuxError::new(MuxErrorKind::BadRequest(e), Some(conn))).await;
                return;
            }
            Err(_) => {
                debug!("Timed out extracting host from {}", peer_addr);
                let e = io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("no host name within {:?}", self.options.timeout),
                );
                let conn = MuxedConn::new(conn, String::new(), peer_addr);
                self.report(MuxError::new(MuxErrorKind::BadRequest(e.into()), Some(conn))).await;
                return;
            }
        };

        let host = (self.options.normalize)(&host);
        let conn = MuxedConn::new(conn, host.clone(), peer_addr);

        let Some((matched, delivery)) = self.registry.get(&host) else {
            debug!("No listener for host {:?} from {}", host, peer_addr);
            self.report(MuxError::new(MuxErrorKind::NotFound(host), Some(conn))).await;
            return;
        };

        match deliver(delivery, conn).await {
            Ok(()) => debug!("Routed {} ({}) to listener {}", peer_addr, host, matched),
            Err(Some(conn)) => {
                debug!("Listener {} went away before taking {}", matched, peer_addr);
                self.report(MuxError::new(MuxErrorKind::NotFound(host), Some(conn))).await;
            }
            Err(None) => warn!("Connection from {} lost with listener {}", peer_addr, matched),
        }
    }

    async fn report(&self, err: MuxError) {
        counter!("tlsmux_mux_errors_total", "kind" => err.kind.label()).increment(1);
        if self.errors.send(err).await.is_err() {
            debug!("Muxer dropped; discarding error");
        }
    }
}
