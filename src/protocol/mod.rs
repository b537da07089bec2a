//! TLS handshake preamble parsing
//!
//! This module reads the unencrypted start of a TLS connection, the record
//! layer and the ClientHello message, so the requested server name can be
//! used for routing before any TLS session exists. Nothing here decrypts or
//! answers the handshake.

mod client_hello;
mod error;
mod record;
#[cfg(test)]
pub(crate) mod testing;

pub use client_hello::ClientHelloMessage;
pub use error::{Alert, ProtocolError};
pub use record::{read_client_hello, MAX_CIPHERTEXT, MAX_HANDSHAKE, MAX_PLAINTEXT};
