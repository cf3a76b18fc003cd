//! # Keystone Auth
//!
//! Tower/Axum middleware that authenticates incoming requests against an
//! OpenStack Keystone v3 identity service, in the style of the Python
//! `keystonemiddleware` auth_token filter:
//!
//! - **Trust boundary**: caller-supplied identity headers are always stripped
//! - **Validation**: `X-Auth-Token` is introspected via `GET /auth/tokens?nocatalog`
//! - **Caching**: optional token → identity cache with a fixed TTL
//! - **Assertion only**: results are written as `X-Identity-Status`, `X-User-*`,
//!   `X-Project-*`, `X-Domain-*` and `X-Roles` headers; the request is always
//!   passed on, and authorization is left to downstream handlers
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Host HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  KeystoneAuthLayer (strip → cache → validate → project)     │
//! ├─────────────────────────────┬───────────────────────────────┤
//! │  TokenCache (optional)      │  TokenValidator               │
//! │  └─ MemoryTokenCache        │  └─ KeystoneClient (reqwest)  │
//! ├─────────────────────────────┴───────────────────────────────┤
//! │  Downstream handlers (read X-Identity-Status)               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use axum::{Router, routing::get};
//! use keystone_auth::{KeystoneAuthLayer, KeystoneClient, KeystoneClientOptions, MemoryTokenCache};
//!
//! # fn main() -> Result<(), keystone_auth::AppError> {
//! let client = KeystoneClient::new(KeystoneClientOptions::new("http://keystone:5000/v3"))?;
//! let auth = KeystoneAuthLayer::new(Arc::new(client))
//!     .with_cache(Arc::new(MemoryTokenCache::default()));
//!
//! let app: Router = Router::new()
//!     .route("/", get(|| async { "hello" }))
//!     .layer(auth);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod keystone;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;

// Re-exports for convenience
pub use cache::{MemoryTokenCache, TokenCache};
pub use config::Config;
pub use error::{AppError, AppResult, ValidationError};
pub use keystone::{KeystoneClient, KeystoneClientOptions, TokenValidator};
pub use middleware::{AuthOutcome, IdentityStatus, KeystoneAuthLayer};
pub use models::IdentityRecord;
pub use routes::build_router;
pub use state::AppState;
