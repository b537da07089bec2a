//! ClientHello parsing errors

use std::fmt;
use std::io;
use thiserror::Error;

/// TLS alert a real server would send for the same input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alert {
    /// Not a handshake record, not a ClientHello, or a malformed ClientHello
    UnexpectedMessage,
    /// Record larger than the protocol allows
    RecordOverflow,
    /// Declared handshake message length out of bounds
    InternalError,
}

impl Alert {
    /// Alert description code from RFC 5246 §7.2
    pub fn code(self) -> u8 {
        match self {
            Alert::UnexpectedMessage => 10,
            Alert::RecordOverflow => 22,
            Alert::InternalError => 80,
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alert::UnexpectedMessage => write!(f, "unexpected message"),
            Alert::RecordOverflow => write!(f, "record overflow"),
            Alert::InternalError => write!(f, "internal error"),
        }
    }
}

/// Failure to extract a ClientHello from a byte stream
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The input is not an acceptable TLS handshake
    #[error("tls: {0}")]
    Alert(Alert),

    /// The first byte looks like an SSLv2 record header
    #[error("tls: unsupported SSLv2 handshake received")]
    UnsupportedSslv2,

    /// The underlying stream failed or ended early
    #[error("{0}")]
    Io(#[from] io::Error),
}

impl From<Alert> for ProtocolError {
    fn from(alert: Alert) -> Self {
        ProtocolError::Alert(alert)
    }
}
