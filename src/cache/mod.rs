//! Token → identity cache interface.
//!
//! The middleware only ever calls `get` and `set`; storage, expiry and
//! eviction belong to the implementation. Implementations are shared across
//! concurrently running requests and must synchronize internally.
//!
//! Keys are raw bearer tokens. Treat them as secrets: never log them.

mod memory;

use std::time::Duration;

use async_trait::async_trait;

use crate::models::IdentityRecord;

pub use memory::MemoryTokenCache;

/// Default lifetime of a cached identity.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// A minimal cache of validated identities.
#[async_trait]
pub trait TokenCache: Send + Sync + 'static {
    /// Backend name, for logs and metrics.
    fn backend_name(&self) -> &'static str;

    /// Look up a still-live identity for `token`.
    async fn get(&self, token: &str) -> Option<IdentityRecord>;

    /// Store `identity` for `token`, replacing any previous entry. The
    /// entry lives for the full `ttl` from now.
    async fn set(&self, token: &str, identity: IdentityRecord, ttl: Duration);
}
