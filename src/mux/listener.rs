//! Per-host listeners
//!
//! A [`Listener`] receives the connections the muxer routed to its name.
//! Delivery is a synchronous handoff: the muxer's classification task waits
//! until the listener has taken the connection, or hands it back if the
//! listener goes away first.

use log::debug;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use super::conn::MuxedConn;
use super::registry::Registry;
use crate::common::{ProxyError, Result};

/// Outcome of offering a connection to a listener
#[derive(Debug)]
pub(crate) enum Delivered {
    Accepted,
    Rejected(MuxedConn),
}

/// A connection on its way to a listener
#[derive(Debug)]
pub(crate) struct Handoff {
    pub conn: MuxedConn,
    pub reply: oneshot::Sender<Delivered>,
}

/// Sending side of a listener, as stored in the registry
pub(crate) type Delivery = mpsc::Sender<Handoff>;

/// Offer `conn` through `delivery` and wait until it is taken
///
/// On failure the connection comes back unless it was lost with the listener.
pub(crate) async fn deliver(delivery: Delivery, conn: MuxedConn) -> std::result::Result<(), Option<MuxedConn>> {
    let (reply, replied) = oneshot::channel();
    if let Err(mpsc::error::SendError(handoff)) = delivery.send(Handoff { conn, reply }).await {
        return Err(Some(handoff.conn));
    }
    match replied.await {
        Ok(Delivered::Accepted) => Ok(()),
        Ok(Delivered::Rejected(conn)) => Err(Some(conn)),
        Err(_) => Err(None),
    }
}

/// Receives connections routed to one virtual host name
///
/// Dropping the listener closes it.
#[derive(Debug)]
pub struct Listener {
    name: String,
    rx: mpsc::Receiver<Handoff>,
    registry: Arc<Registry<Delivery>>,
    local_addr: SocketAddr,
    closed: bool,
}

impl Listener {
    pub(crate) fn new(
        name: String,
        rx: mpsc::Receiver<Handoff>,
        registry: Arc<Registry<Delivery>>,
        local_addr: SocketAddr,
    ) -> Self {
        Self {
            name,
            rx,
            registry,
            local_addr,
            closed: false,
        }
    }

    /// Wait for the next connection routed to this name
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::ListenerClosed`] once the listener or the muxer
    /// has been closed.
    pub async fn accept(&mut self) -> Result<MuxedConn> {
        if self.closed {
            return Err(ProxyError::ListenerClosed);
        }
        match self.rx.recv().await {
            Some(Handoff { conn, reply }) => {
                // the muxer may have given up waiting; the connection is ours either way
                let _ = reply.send(Delivered::Accepted);
                Ok(conn)
            }
            None => Err(ProxyError::ListenerClosed),
        }
    }

    /// Unregister the name and refuse further connections
    ///
    /// Connections already waiting are handed back to the muxer. Closing
    /// twice is a no-op.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.rx.close();
        // the name may already belong to a newer listener
        self.registry.remove_if(&self.name, |delivery| delivery.is_closed());
        while let Ok(Handoff { conn, reply }) = self.rx.try_recv() {
            let _ = reply.send(Delivered::Rejected(conn));
        }
        debug!("Closed listener for {}", self.name);
    }

    /// The normalized name this listener was registered under
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Address of the muxer's underlying socket
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.close();
    }
}
