//! Backend selection strategies
//!
//! A frontend owns one strategy, shared by every relay task of that
//! frontend.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::common::{ProxyError, Result};
use crate::config::{BackendConfig, StrategyKind};

/// Picks the backend for the next connection
pub trait BackendStrategy: Send + Sync + fmt::Debug {
    fn next_backend(&self) -> &BackendConfig;
}

/// Cycles through the backends in order
#[derive(Debug)]
pub struct RoundRobin {
    backends: Vec<BackendConfig>,
    index: AtomicUsize,
}

impl RoundRobin {
    /// # Errors
    ///
    /// Fails if `backends` is empty.
    pub fn new(backends: Vec<BackendConfig>) -> Result<Self> {
        if backends.is_empty() {
            return Err(ProxyError::Config("round robin needs at least one backend".to_string()));
        }
        Ok(Self {
            backends,
            index: AtomicUsize::new(0),
        })
    }
}

impl BackendStrategy for RoundRobin {
    /// Advances the cursor, then returns the backend it points at
    fn next_backend(&self) -> &BackendConfig {
        let len = self.backends.len();
        if len == 1 {
            return &self.backends[0];
        }
        let previous = self
            .index
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |i| Some((i + 1) % len))
            .unwrap_or_else(|i| i);
        &self.backends[(previous + 1) % len]
    }
}

/// Build the strategy named by `kind`
pub fn build_strategy(kind: StrategyKind, backends: Vec<BackendConfig>) -> Result<Arc<dyn BackendStrategy>> {
    match kind {
        StrategyKind::RoundRobin => Ok(Arc::new(RoundRobin::new(backends)?)),
    }
}
