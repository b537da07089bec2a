//! Virtual host name registry
//!
//! Maps normalized host names to listeners. Besides exact names, entries of
//! the form `*.suffix` match any host that ends in `.suffix`, with the most
//! specific registration winning. Once closed, a registry is empty for good.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::common::{ProxyError, Result};

/// Concurrent name to value map with wildcard lookup
#[derive(Debug)]
pub(crate) struct Registry<T> {
    entries: RwLock<Entries<T>>,
}

#[derive(Debug)]
struct Entries<T> {
    names: HashMap<String, T>,
    closed: bool,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(Entries {
                names: HashMap::new(),
                closed: false,
            }),
        }
    }
}

impl<T: Clone> Registry<T> {
    /// Register `value` under `name`; an existing entry is left untouched
    ///
    /// Fails with [`ProxyError::MuxerClosed`] after [`close`](Self::close).
    pub fn insert(&self, name: String, value: T) -> Result<()> {
        let mut entries = self.write();
        if entries.closed {
            return Err(ProxyError::MuxerClosed);
        }
        if entries.names.contains_key(&name) {
            return Err(ProxyError::AlreadyBound(name));
        }
        entries.names.insert(name, value);
        Ok(())
    }

    /// Look up `name`, trying the exact name and then each wildcard suffix
    ///
    /// Returns the registered key that matched along with its value.
    pub fn get(&self, name: &str) -> Option<(String, T)> {
        let entries = self.read();
        lookup_candidates(name).find_map(|candidate| {
            entries
                .names
                .get(candidate.as_ref())
                .map(|value| (candidate.into_owned(), value.clone()))
        })
    }

    /// Remove `name` only if its current value satisfies `pred`
    pub fn remove_if(&self, name: &str, pred: impl FnOnce(&T) -> bool) -> Option<T> {
        let mut entries = self.write();
        match entries.names.get(name) {
            Some(value) if pred(value) => entries.names.remove(name),
            _ => None,
        }
    }

    /// Drop every entry and refuse new ones
    pub fn close(&self) {
        let mut entries = self.write();
        entries.closed = true;
        entries.names.clear();
    }

    pub fn len(&self) -> usize {
        self.read().names.len()
    }

    fn read(&self) -> RwLockReadGuard<'_, Entries<T>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries<T>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Names to try for `name`, most specific first
///
/// `a.b.example.com` yields itself, `*.b.example.com`, `*.example.com` and
/// `*.com`. The first label is always replaced, the last never is.
fn lookup_candidates(name: &str) -> impl Iterator<Item = Cow<'_, str>> {
    let wildcards = name
        .match_indices('.')
        .map(move |(i, _)| Cow::Owned(format!("*{}", &name[i..])));
    std::iter::once(Cow::Borrowed(name)).chain(wildcards)
}
