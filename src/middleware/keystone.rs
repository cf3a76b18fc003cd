//! Keystone token authentication middleware.
//!
//! Validates the `X-Auth-Token` request header against a Keystone identity
//! service and annotates the request with what was learned about the caller.
//! It never rejects a request: the downstream service is always called, and
//! decides for itself what to do with `X-Identity-Status: Invalid`.
//!
//! # Per-request flow
//!
//! ```text
//! strip identity headers, X-Identity-Status = Invalid
//!    │
//!    ├─ no token ───────────────────────────────────────────┐
//!    │                                                      │
//!    ├─ cache hit ──┐                                       │
//!    │              ├─ cache.set(ttl) → Confirmed + headers ┤
//!    ├─ validate ok ┘                                       │
//!    │                                                      │
//!    └─ validate err → warn!, stays Invalid ────────────────┤
//!                                                           ▼
//!                                                   inner service (once)
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! let client = KeystoneClient::new(KeystoneClientOptions::new("http://keystone:5000/v3"))?;
//! let auth = KeystoneAuthLayer::new(Arc::new(client))
//!     .with_cache(Arc::new(MemoryTokenCache::default()));
//! let app = Router::new().route("/", get(handler)).layer(auth);
//! ```
//!
//! # Cancellation
//!
//! The validation request lives inside the service future. If the caller goes
//! away and the host drops that future, the outstanding request is dropped
//! with it.

use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, Request, Response};
use tower::{Layer, Service};
use tracing::{debug, warn};

use super::headers::{
    IDENTITY_STATUS, IdentityStatus, apply_identity_headers, project_identity,
    strip_identity_headers,
};
use crate::cache::{DEFAULT_CACHE_TTL, TokenCache};
use crate::keystone::{AUTH_TOKEN_HEADER, TokenValidator};
use crate::metrics;
use crate::models::IdentityRecord;

/// How a single request left the middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// No usable `X-Auth-Token` header
    NoToken,
    /// Identity served from the token cache
    CacheHit,
    /// Identity confirmed by the identity service
    Validated,
    /// The identity service could not confirm the token
    Failed,
}

impl AuthOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthOutcome::NoToken => "no_token",
            AuthOutcome::CacheHit => "cache_hit",
            AuthOutcome::Validated => "validated",
            AuthOutcome::Failed => "failed",
        }
    }

    pub fn status(self) -> IdentityStatus {
        match self {
            AuthOutcome::CacheHit | AuthOutcome::Validated => IdentityStatus::Confirmed,
            AuthOutcome::NoToken | AuthOutcome::Failed => IdentityStatus::Invalid,
        }
    }
}

/// Validator, cache and TTL shared by every clone of the service.
pub struct Authenticator {
    validator: Arc<dyn TokenValidator>,
    cache: Option<Arc<dyn TokenCache>>,
    cache_ttl: Duration,
}

impl Authenticator {
    /// Run the authentication steps against `req` in place.
    ///
    /// Always leaves `X-Identity-Status` set, and on success the identity
    /// headers plus an `IdentityRecord` request extension. Every request also
    /// gets its `IdentityStatus` as an extension.
    pub async fn authenticate<B>(&self, req: &mut Request<B>) -> AuthOutcome {
        strip_identity_headers(req.headers_mut());
        set_status(req, IdentityStatus::Invalid);

        let Some(token) = extract_token(req.headers()) else {
            debug!("No auth token on request");
            return AuthOutcome::NoToken;
        };

        let (identity, outcome) = match self.cached(&token).await {
            Some(identity) => (identity, AuthOutcome::CacheHit),
            None => match self.validator.validate(&token).await {
                Ok(identity) => (identity, AuthOutcome::Validated),
                Err(e) => {
                    warn!(
                        error_kind = e.kind(),
                        timeout = e.is_timeout(),
                        error = %e,
                        "Failed to validate token"
                    );
                    metrics::record_validation_failure(e.kind());
                    return AuthOutcome::Failed;
                }
            },
        };

        // Hits are re-stored too, so every success restarts the full TTL
        if let Some(cache) = &self.cache {
            cache.set(&token, identity.clone(), self.cache_ttl).await;
        }

        debug!(
            user_id = %identity.user.id,
            cached = outcome == AuthOutcome::CacheHit,
            "Identity confirmed"
        );

        set_status(req, IdentityStatus::Confirmed);
        apply_identity_headers(req.headers_mut(), project_identity(&identity));
        req.extensions_mut().insert(identity);

        outcome
    }

    async fn cached(&self, token: &str) -> Option<IdentityRecord> {
        let cache = self.cache.as_ref()?;
        let hit = cache.get(token).await;
        metrics::record_cache_lookup(hit.is_some());
        debug!(backend = cache.backend_name(), hit = hit.is_some(), "Token cache lookup");
        hit
    }
}

fn set_status<B>(req: &mut Request<B>, status: IdentityStatus) {
    req.headers_mut()
        .insert(HeaderName::from_static(IDENTITY_STATUS), status.header_value());
    req.extensions_mut().insert(status);
}

/// Bearer token from `X-Auth-Token`; empty or non-visible-ASCII values count as absent.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTH_TOKEN_HEADER)?;
    match value.to_str() {
        Ok(token) if !token.is_empty() => Some(token.to_string()),
        Ok(_) => None,
        Err(_) => {
            debug!("Ignoring auth token that is not visible ASCII");
            None
        }
    }
}

/// Keystone authentication layer.
///
/// Caching is off until [`KeystoneAuthLayer::with_cache`] is called.
#[derive(Clone)]
pub struct KeystoneAuthLayer {
    validator: Arc<dyn TokenValidator>,
    cache: Option<Arc<dyn TokenCache>>,
    cache_ttl: Duration,
}

impl KeystoneAuthLayer {
    pub fn new(validator: Arc<dyn TokenValidator>) -> Self {
        Self {
            validator,
            cache: None,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }

    /// Cache confirmed identities in `cache`.
    pub fn with_cache(mut self, cache: Arc<dyn TokenCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Install `cache` if one is given; `None` leaves caching disabled.
    pub fn with_optional_cache(mut self, cache: Option<Arc<dyn TokenCache>>) -> Self {
        self.cache = cache;
        self
    }

    /// Lifetime of each cache write (default: 5 minutes).
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn caching_enabled(&self) -> bool {
        self.cache.is_some()
    }

    fn authenticator(&self) -> Arc<Authenticator> {
        Arc::new(Authenticator {
            validator: self.validator.clone(),
            cache: self.cache.clone(),
            cache_ttl: self.cache_ttl,
        })
    }
}

impl<S> Layer<S> for KeystoneAuthLayer {
    type Service = KeystoneAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        KeystoneAuthService {
            inner,
            authenticator: self.authenticator(),
        }
    }
}

/// Keystone authentication service wrapper.
#[derive(Clone)]
pub struct KeystoneAuthService<S> {
    inner: S,
    authenticator: Arc<Authenticator>,
}

impl<S> Service<Request<Body>> for KeystoneAuthService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let authenticator = self.authenticator.clone();
        // Keep the instance that was polled ready; leave a fresh clone behind
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let outcome = authenticator.authenticate(&mut req).await;
            metrics::record_request_outcome(outcome.as_str());

            inner.call(req).await
        })
    }
}
