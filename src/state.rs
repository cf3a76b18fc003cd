//! Shared application state for Axum handlers.
//!
//! Holds the configuration, the identity validator and the optional
//! in-memory token cache. When caching is enabled a background task sweeps
//! expired identities out of the cache.
//!
//! # Structured Concurrency
//!
//! Background tasks are managed using `tokio_util::task::TaskTracker` and
//! `CancellationToken`. Call `shutdown()` to stop them before exit.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

use crate::cache::{MemoryTokenCache, TokenCache};
use crate::config::Config;
use crate::keystone::TokenValidator;
use crate::middleware::KeystoneAuthLayer;

/// Shared application state for Axum handlers.
///
/// Cheap to clone; everything inside is reference counted.
///
/// # Lifecycle
///
/// Must be created inside a Tokio runtime because it may spawn the cache
/// purge task. Call `shutdown()` before dropping:
///
/// ```rust,ignore
/// let state = AppState::new(Arc::new(keystone_client), config);
/// // ... serve ...
/// state.shutdown().await;
/// ```
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Timestamp when the application started
    pub started_at: Instant,
    /// Identity service used on cache misses
    validator: Arc<dyn TokenValidator>,
    /// Token cache (None = caching disabled)
    token_cache: Option<Arc<MemoryTokenCache>>,
    /// Tracks spawned background tasks for graceful shutdown
    task_tracker: TaskTracker,
    /// Cancellation token for signaling background tasks to stop
    cancellation_token: CancellationToken,
}

impl AppState {
    /// Create application state around a validator.
    ///
    /// Creates the in-memory token cache and its purge task when
    /// `config.token_cache_enabled` is set.
    pub fn new(validator: Arc<dyn TokenValidator>, config: Config) -> Self {
        let token_cache = config
            .token_cache_enabled
            .then(|| Arc::new(MemoryTokenCache::new(config.token_cache_max_entries)));

        let state = Self {
            config: Arc::new(config),
            started_at: Instant::now(),
            validator,
            token_cache,
            task_tracker: TaskTracker::new(),
            cancellation_token: CancellationToken::new(),
        };

        if let Some(cache) = &state.token_cache {
            state.spawn_cache_purge_task(cache.clone(), state.config.token_cache_purge_interval);
        }

        state
    }

    /// Authentication layer wired to this state's validator and cache.
    pub fn auth_layer(&self) -> KeystoneAuthLayer {
        KeystoneAuthLayer::new(self.validator.clone())
            .with_optional_cache(
                self.token_cache
                    .clone()
                    .map(|cache| cache as Arc<dyn TokenCache>),
            )
            .with_cache_ttl(self.config.token_cache_ttl)
    }

    pub fn cache_enabled(&self) -> bool {
        self.token_cache.is_some()
    }

    /// Number of identities currently cached (0 when caching is disabled).
    pub async fn cache_entries(&self) -> usize {
        match &self.token_cache {
            Some(cache) => cache.len().await,
            None => 0,
        }
    }

    /// Periodically drop expired identities from the cache.
    fn spawn_cache_purge_task(&self, cache: Arc<MemoryTokenCache>, every: Duration) {
        let cancel = self.cancellation_token.clone();

        self.task_tracker.spawn(async move {
            let mut ticker = interval(every);
            ticker.tick().await; // Skip the first immediate tick

            loop {
                tokio::select! {
                    biased;

                    _ = cancel.cancelled() => {
                        debug!("Cache purge task received cancellation signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        cache.purge_expired().await;
                    }
                }
            }

            debug!("Cache purge task shutting down");
        });
    }

    /// Gracefully shutdown all background tasks.
    ///
    /// Signals cancellation, closes the tracker and waits for every task.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown of background tasks");

        self.cancellation_token.cancel();
        self.task_tracker.close();
        self.task_tracker.wait().await;

        info!("All background tasks have completed");
    }

    /// Get the application uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
