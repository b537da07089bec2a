//! TLS handling module
//!
//! Terminates TLS for frontends that carry their own certificate material.

mod acceptor;
#[cfg(test)]
pub(crate) mod testing;

pub use acceptor::{accept_tls, create_tls_acceptor};
