//! Errors reported on the muxer's error stream

use std::fmt;
use thiserror::Error;

use super::conn::MuxedConn;
use crate::protocol::ProtocolError;

/// What went wrong with a connection or with the muxer itself
#[derive(Debug, Error)]
pub enum MuxErrorKind {
    /// No listener matches the requested host
    #[error("host not found: {0}")]
    NotFound(String),

    /// The host name could not be extracted in time
    #[error("failed to extract host name: {0}")]
    BadRequest(#[source] ProtocolError),

    /// The muxer stopped accepting connections
    #[error("muxer closed: {0}")]
    Closed(String),

    /// Connection handling failed unexpectedly
    #[error("internal error: {0}")]
    Internal(String),
}

impl MuxErrorKind {
    /// Short label used for metrics
    pub fn label(&self) -> &'static str {
        match self {
            MuxErrorKind::NotFound(_) => "not_found",
            MuxErrorKind::BadRequest(_) => "bad_request",
            MuxErrorKind::Closed(_) => "closed",
            MuxErrorKind::Internal(_) => "internal",
        }
    }
}

/// An error from the muxer, carrying the affected connection if there is one
///
/// Only [`MuxErrorKind::Closed`] is terminal: the muxer accepts nothing
/// after it. Connections that were still being classified when it closed
/// may report `NotFound`, `BadRequest` or `Internal` afterwards.
#[derive(Debug)]
pub struct MuxError {
    pub kind: MuxErrorKind,
    pub conn: Option<MuxedConn>,
}

impl MuxError {
    pub fn new(kind: MuxErrorKind, conn: Option<MuxedConn>) -> Self {
        Self { kind, conn }
    }

    /// Whether the muxer has stopped
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, MuxErrorKind::Closed(_))
    }

    /// Take the attached connection, leaving `None`
    pub fn take_conn(&mut self) -> Option<MuxedConn> {
        self.conn.take()
    }
}

impl fmt::Display for MuxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

impl std::error::Error for MuxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.kind)
    }
}
