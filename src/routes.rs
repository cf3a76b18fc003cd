//! Application routing configuration with middleware stack.
//!
//! # Middleware Stack (outermost first)
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │     Tracing      │ ← HTTP request/response logging
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │      CORS        │ ← Cross-origin headers
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │  Keystone Auth   │ ← X-Identity-Status + identity headers (never rejects)
//! └────────┬─────────┘
//!          │
//!          ▼
//!      Handler
//! ```
//!
//! # Routes
//!
//! - `GET /health` - Liveness (ignores identity headers)
//! - `GET /whoami` - Reports the caller's confirmed identity, 401 otherwise

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers;
use crate::state::AppState;

/// Build the application router with all routes and middleware configured.
pub fn build_router(state: AppState) -> Router {
    let config = &state.config;
    let cors = build_cors_layer(&config.cors_allowed_origins);

    let auth_layer = state.auth_layer();
    if auth_layer.caching_enabled() {
        info!(
            ttl_secs = config.token_cache_ttl.as_secs(),
            max_entries = config.token_cache_max_entries,
            "Token cache enabled"
        );
    } else {
        info!("Token cache disabled (TOKEN_CACHE_ENABLED=false)");
    }

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/whoami", get(handlers::whoami))
        // Applied bottom to top: auth runs closest to the handlers
        .layer(auth_layer)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build CORS layer from configuration.
///
/// `["*"]` allows any origin; otherwise only the listed, parseable origins.
fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<_> = allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}
