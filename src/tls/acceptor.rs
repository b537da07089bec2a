//! TLS acceptor creation for terminating frontends

use log::{debug, info};
use openssl::ssl::{Ssl, SslAcceptor, SslFiletype, SslMethod};
use std::path::Path;
use std::pin::Pin;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_openssl::SslStream;

use crate::common::{ProxyError, Result};

/// Create a TLS acceptor from a PEM certificate chain and private key
///
/// Uses the Mozilla intermediate profile; client certificates are not
/// requested.
///
/// # Example
///
/// ```no_run
/// # use std::path::Path;
/// # use tlsmux::tls::create_tls_acceptor;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let acceptor = create_tls_acceptor(
///     Path::new("/etc/tlsmux/example.com.crt"),
///     Path::new("/etc/tlsmux/example.com.key"),
/// )?;
/// # Ok(())
/// # }
/// ```
pub fn create_tls_acceptor(cert_path: &Path, key_path: &Path) -> Result<SslAcceptor> {
    let mut acceptor = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls())?;

    // Apply the certificate and key
    acceptor.set_certificate_chain_file(cert_path)?;
    acceptor.set_private_key_file(key_path, SslFiletype::PEM)?;
    acceptor.check_private_key()?;

    info!("Loaded TLS certificate {}", cert_path.display());
    Ok(acceptor.build())
}

/// Perform the server side of a TLS handshake over `stream`
///
/// # Errors
///
/// Returns [`ProxyError::TlsHandshake`] if the handshake fails.
pub async fn accept_tls<S>(acceptor: &SslAcceptor, stream: S) -> Result<Pin<Box<SslStream<S>>>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let ssl = Ssl::new(acceptor.context())?;
    let mut stream = Box::pin(SslStream::new(ssl, stream)?);

    if let Err(e) = stream.as_mut().accept().await {
        return Err(ProxyError::TlsHandshake(e.to_string()));
    }

    debug!(
        "TLS handshake complete ({})",
        stream.ssl().version_str()
    );
    Ok(stream)
}
