//! Proxy server module
//!
//! Wires the configuration to a TLS muxer: one listener and accept loop per
//! frontend, plus the loop that consumes the muxer's error stream and sends
//! unmatched connections to the default frontend.

use log::{debug, error, info, warn};
use metrics::counter;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinSet;

use super::frontend::Frontend;
use super::handler::handle_connection;
use super::redirect::serve_redirect;
use crate::common::{ProxyError, Result};
use crate::config::{validate_config, Configuration, FrontendConfig};
use crate::mux::{Listener, MuxCloser, MuxErrorKind, MuxOptions, MuxedConn, TlsMuxer};

/// Proxy server structure
///
/// Holds the bound sockets and loaded certificate material; nothing is
/// accepted until [`run`](Server::run) is called.
pub struct Server {
    muxer: TlsMuxer,
    frontends: Vec<(Arc<Frontend>, Listener)>,
    default_frontend: Option<Arc<Frontend>>,
    redirect: Option<TcpListener>,
    buffer_size: usize,
}

impl Server {
    /// Validate `config`, load certificates and bind the listening sockets
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, certificate material
    /// cannot be loaded or the TLS listen address cannot be bound. Failing to
    /// bind the redirect address is logged and the redirect server skipped.
    pub async fn bind(config: &Configuration) -> Result<Self> {
        validate_config(config)?;

        let frontends = config
            .frontends
            .iter()
            .map(|f| Frontend::from_config(f).map(Arc::new))
            .collect::<Result<Vec<_>>>()?;

        let listen_addr = config.listen_addr()?;
        let listener = TcpListener::bind(listen_addr).await.map_err(ProxyError::Io)?;
        let options = MuxOptions::default().with_timeout(config.mux_timeout());
        let muxer = TlsMuxer::new(listener, options)?;
        info!("TLS muxer listening on {}", muxer.local_addr());

        let mut bound = Vec::with_capacity(frontends.len());
        for frontend in frontends {
            let listener = muxer.listen(frontend.name())?;
            bound.push((frontend, listener));
        }
        let default_host = config.default_frontend().map(FrontendConfig::host);
        let default_frontend = bound
            .iter()
            .find(|(frontend, _)| Some(frontend.name()) == default_host.as_deref())
            .map(|(frontend, _)| Arc::clone(frontend));

        let redirect = if config.redirect {
            let addr = config.redirect_addr()?;
            match TcpListener::bind(addr).await {
                Ok(listener) => Some(listener),
                Err(e) => {
                    error!("Failed to bind redirect listener on {}: {}", addr, e);
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            muxer,
            frontends: bound,
            default_frontend,
            redirect,
            buffer_size: config.buffer_size,
        })
    }

    /// Address the TLS muxer is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.muxer.local_addr()
    }

    /// Address of the redirect server, if it is enabled and bound
    pub fn redirect_addr(&self) -> Option<SocketAddr> {
        self.redirect.as_ref().and_then(|l| l.local_addr().ok())
    }

    /// Handle that stops the server
    pub fn shutdown_handle(&self) -> MuxCloser {
        self.muxer.closer()
    }

    /// Serve until the muxer is closed
    ///
    /// Returns once every frontend accept loop has stopped. Relays already
    /// in progress keep running.
    pub async fn run(self) -> Result<()> {
        let Server {
            muxer,
            frontends,
            default_frontend,
            redirect,
            buffer_size,
        } = self;

        let mut tasks = JoinSet::new();
        for (frontend, listener) in frontends {
            tasks.spawn(serve_frontend(frontend, listener, buffer_size));
        }

        let redirect = redirect.map(|listener| {
            tokio::spawn(async move {
                if let Err(e) = serve_redirect(listener).await {
                    error!("{}", e);
                }
            })
        });

        loop {
            let mut err = muxer.next_error().await;
            let conn = err.take_conn();
            match &err.kind {
                MuxErrorKind::Closed(reason) => {
                    info!("Muxer closed ({}), shutting down", reason);
                    break;
                }
                MuxErrorKind::NotFound(host) => match (&default_frontend, conn) {
                    (Some(frontend), Some(conn)) => {
                        debug!(
                            "No frontend for {:?} from {}, using default {}",
                            host,
                            conn.peer_addr(),
                            frontend.name()
                        );
                        counter!("tlsmux_connections_routed_total", "frontend" => frontend.name().to_string())
                            .increment(1);
                        tokio::spawn(relay(conn, Arc::clone(frontend), buffer_size));
                    }
                    _ => warn!("{}", err),
                },
                MuxErrorKind::BadRequest(_) => {
                    let peer = conn.as_ref().map(MuxedConn::peer_addr);
                    warn!("Dropping connection from {:?}: {}", peer, err);
                }
                MuxErrorKind::Internal(_) => error!("{}", err),
            }
        }

        // the muxer has released every listener; wait for the loops to notice
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!("Task error: {}", e);
            }
        }
        if let Some(redirect) = redirect {
            redirect.abort();
        }

        info!("Server stopped");
        Ok(())
    }
}

/// Accept loop of one frontend
async fn serve_frontend(frontend: Arc<Frontend>, mut listener: Listener, buffer_size: usize) {
    info!("Frontend {} accepting connections", frontend.name());

    let mut relays = JoinSet::new();
    loop {
        // Reap finished relays and log panics
        while let Some(result) = relays.try_join_next() {
            if let Err(e) = result {
                error!("Relay task error: {}", e);
            }
        }

        let conn = match listener.accept().await {
            Ok(conn) => conn,
            Err(ProxyError::ListenerClosed) => break,
            Err(e) => {
                error!("Frontend {} failed to accept: {}", frontend.name(), e);
                break;
            }
        };

        counter!("tlsmux_connections_routed_total", "frontend" => frontend.name().to_string()).increment(1);
        relays.spawn(relay(conn, Arc::clone(&frontend), buffer_size));
    }

    relays.detach_all();
    info!("Frontend {} stopped", frontend.name());
}

async fn relay(conn: MuxedConn, frontend: Arc<Frontend>, buffer_size: usize) {
    let peer = conn.peer_addr();
    match handle_connection(conn, &frontend, buffer_size).await {
        Ok(stats) => debug!(
            "Connection from {} via {} closed ({} bytes up, {} bytes down)",
            peer,
            frontend.name(),
            stats.client_to_backend,
            stats.backend_to_client
        ),
        Err(e) => warn!("Connection from {} via {} failed: {}", peer, frontend.name(), e),
    }
}
