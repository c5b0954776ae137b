//! In-memory set of revoked session tokens.
//!
//! Keys are SHA-256 hex hashes of tokens; presence means revoked. The cache is process
//! local, so a restart forgets logouts. Expiry is enforced by JWT validation before the
//! revocation check, so only live tokens matter here.

use foyer::{Cache, CacheBuilder};
use std::sync::Arc;

/// Default capacity: roughly 1-2 MB of 64-byte hex keys.
pub const DEFAULT_CAPACITY: usize = 10_000;

#[derive(Clone)]
pub struct RevocationCache {
    inner: Arc<Cache<String, ()>>,
}

impl RevocationCache {
    pub fn new(capacity: usize) -> Self {
        let cache = CacheBuilder::new(capacity).build();
        Self {
            inner: Arc::new(cache),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Mark a token hash as logged out.
    pub fn revoke(&self, token_hash: impl Into<String>) {
        self.inner.insert(token_hash.into(), ());
    }

    pub fn is_revoked(&self, token_hash: &str) -> bool {
        self.inner.get(token_hash).is_some()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inner.usage()
    }
}

impl Default for RevocationCache {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

impl std::fmt::Debug for RevocationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevocationCache")
            .field("usage", &self.inner.usage())
            .finish()
    }
}
