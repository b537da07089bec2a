//! Runtime state of a virtual host

use log::info;
use openssl::ssl::SslAcceptor;
use std::fmt;
use std::sync::Arc;

use super::strategy::{build_strategy, BackendStrategy};
use crate::common::Result;
use crate::config::FrontendConfig;
use crate::tls::create_tls_acceptor;

/// A virtual host: its backends and optional TLS termination
pub struct Frontend {
    name: String,
    strategy: Arc<dyn BackendStrategy>,
    acceptor: Option<Arc<SslAcceptor>>,
}

impl Frontend {
    pub fn new(
        name: impl Into<String>,
        strategy: Arc<dyn BackendStrategy>,
        acceptor: Option<SslAcceptor>,
    ) -> Self {
        Self {
            name: name.into(),
            strategy,
            acceptor: acceptor.map(Arc::new),
        }
    }

    /// Build a frontend, loading its certificate material if it has any
    pub fn from_config(config: &FrontendConfig) -> Result<Self> {
        let strategy = build_strategy(config.strategy, config.backends.clone())?;
        let acceptor = match config.tls_material() {
            Some((cert, key)) => Some(create_tls_acceptor(cert, key)?),
            None => None,
        };

        info!(
            "Frontend {} with {} backend(s){}{}",
            config.name,
            config.backends.len(),
            if acceptor.is_some() { ", terminating TLS" } else { "" },
            if config.default { ", default" } else { "" }
        );
        Ok(Self::new(config.host(), strategy, acceptor))
    }

    /// Host name the frontend is registered under
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn strategy(&self) -> &dyn BackendStrategy {
        self.strategy.as_ref()
    }

    /// Acceptor used to terminate TLS, if this frontend does
    pub fn acceptor(&self) -> Option<&SslAcceptor> {
        self.acceptor.as_deref()
    }
}

impl fmt::Debug for Frontend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frontend")
            .field("name", &self.name)
            .field("strategy", &self.strategy)
            .field("terminates_tls", &self.acceptor.is_some())
            .finish()
    }
}
