//! Application configuration loaded from environment variables.
//!
//! All configuration is loaded from environment variables with defaults
//! suitable for a local Keystone. In production, configure via environment
//! variables or a `.env` file.
//!
//! # Identity Service
//!
//! - `KEYSTONE_URL`: Keystone v3 base URL (default: `http://localhost:5000/v3`)
//! - `KEYSTONE_TIMEOUT_MS`: Validation request timeout (default: 5000)
//! - `KEYSTONE_USER_AGENT`: Agent string sent to Keystone
//!
//! # Token Cache
//!
//! - `TOKEN_CACHE_ENABLED`: Cache confirmed identities in memory (default: true)
//! - `TOKEN_CACHE_TTL_SECS`: Lifetime of a cache entry (default: 300, max: 86400)
//! - `TOKEN_CACHE_MAX_ENTRIES`: Capacity of the in-memory cache (default: 10000)
//! - `TOKEN_CACHE_PURGE_INTERVAL_SECS`: Expired entry sweep interval (default: 60)

use std::env;
use std::time::Duration;

use reqwest::Url;

use crate::cache::DEFAULT_CACHE_TTL;
use crate::error::{AppError, AppResult};
use crate::keystone::{DEFAULT_USER_AGENT, DEFAULT_VALIDATION_TIMEOUT, KeystoneClientOptions};

/// Longest accepted `TOKEN_CACHE_TTL_SECS` (one day).
pub const MAX_TOKEN_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Log output format for the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Application configuration loaded from environment variables.
///
/// # Example
///
/// ```rust,ignore
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.server_addr());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Server host address (default: "0.0.0.0")
    pub host: String,

    /// Server port (default: 3000)
    pub port: u16,

    // =========================================================================
    // Identity Service Configuration
    // =========================================================================
    /// Keystone v3 endpoint, e.g. `http://keystone:5000/v3`
    pub keystone_url: String,

    /// Bound on a single validation request (default: 5 seconds)
    pub keystone_timeout: Duration,

    /// Agent string sent with validation requests
    pub keystone_user_agent: String,

    // =========================================================================
    // Token Cache Configuration
    // =========================================================================
    /// Whether confirmed identities are cached in memory (default: true)
    pub token_cache_enabled: bool,

    /// Lifetime of a cached identity, restarted on every successful lookup (default: 5 minutes)
    pub token_cache_ttl: Duration,

    /// Maximum number of cached identities (default: 10000)
    pub token_cache_max_entries: usize,

    /// How often expired identities are swept from memory (default: 60 seconds)
    pub token_cache_purge_interval: Duration,

    // =========================================================================
    // HTTP Configuration
    // =========================================================================
    /// Comma-separated list of allowed CORS origins
    /// Use "*" to allow all origins (not recommended for production)
    pub cors_allowed_origins: Vec<String>,

    // =========================================================================
    // Observability Configuration
    // =========================================================================
    /// Log level (e.g., "info", "debug", "trace")
    pub log_level: String,

    /// `pretty` (default) or `json`
    pub log_format: LogFormat,

    /// Port for Prometheus metrics endpoint (default: 9090, 0 = disabled)
    pub metrics_port: u16,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if any value fails to parse or the
    /// resulting configuration is invalid.
    pub fn from_env() -> AppResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let config = Self {
            // Server
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: Self::parse_env("PORT", 3000)?,

            // Identity service
            keystone_url: env::var("KEYSTONE_URL")
                .unwrap_or_else(|_| "http://localhost:5000/v3".to_string()),
            keystone_timeout: Duration::from_millis(Self::parse_env(
                "KEYSTONE_TIMEOUT_MS",
                5000,
            )?),
            keystone_user_agent: env::var("KEYSTONE_USER_AGENT")
                .ok()
                .filter(|ua| !ua.is_empty())
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),

            // Token cache
            token_cache_enabled: Self::parse_env("TOKEN_CACHE_ENABLED", true)?,
            token_cache_ttl: Duration::from_secs(Self::parse_env("TOKEN_CACHE_TTL_SECS", 300)?),
            token_cache_max_entries: Self::parse_env("TOKEN_CACHE_MAX_ENTRIES", 10_000)?,
            token_cache_purge_interval: Duration::from_secs(Self::parse_env(
                "TOKEN_CACHE_PURGE_INTERVAL_SECS",
                60,
            )?),

            // HTTP
            cors_allowed_origins: Self::parse_cors_origins(),

            // Observability
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            log_format: Self::log_format_from_env()?,
            metrics_port: Self::parse_env("METRICS_PORT", 9090)?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values for consistency and correctness.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if validation fails.
    pub fn validate(&self) -> AppResult<()> {
        let url = Url::parse(&self.keystone_url).map_err(|e| {
            AppError::ConfigError(format!("KEYSTONE_URL is not a valid URL: {e}"))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::ConfigError(format!(
                "KEYSTONE_URL must use http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.keystone_timeout.is_zero() {
            return Err(AppError::ConfigError(
                "KEYSTONE_TIMEOUT_MS must be greater than 0".to_string(),
            ));
        }

        if self.token_cache_enabled {
            if self.token_cache_ttl.is_zero() {
                return Err(AppError::ConfigError(
                    "TOKEN_CACHE_TTL_SECS must be greater than 0 when caching is enabled"
                        .to_string(),
                ));
            }

            if self.token_cache_ttl > MAX_TOKEN_CACHE_TTL {
                return Err(AppError::ConfigError(format!(
                    "TOKEN_CACHE_TTL_SECS must be at most {}",
                    MAX_TOKEN_CACHE_TTL.as_secs()
                )));
            }

            if self.token_cache_max_entries == 0 {
                return Err(AppError::ConfigError(
                    "TOKEN_CACHE_MAX_ENTRIES must be greater than 0".to_string(),
                ));
            }

            if self.token_cache_purge_interval.is_zero() {
                return Err(AppError::ConfigError(
                    "TOKEN_CACHE_PURGE_INTERVAL_SECS must be greater than 0".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Get the full server address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Options for building the Keystone client.
    pub fn keystone_options(&self) -> KeystoneClientOptions {
        KeystoneClientOptions::new(self.keystone_url.clone())
            .with_timeout(self.keystone_timeout)
            .with_user_agent(self.keystone_user_agent.clone())
    }

    /// Check if Prometheus metrics export is enabled.
    pub fn metrics_enabled(&self) -> bool {
        self.metrics_port > 0
    }

    /// Get the metrics endpoint address.
    ///
    /// Returns `None` if metrics are disabled (port = 0).
    pub fn metrics_addr(&self) -> Option<std::net::SocketAddr> {
        self.metrics_enabled()
            .then(|| std::net::SocketAddr::from(([0, 0, 0, 0], self.metrics_port)))
    }

    /// Parse an environment variable into the specified type with a default value.
    fn parse_env<T>(name: &str, default: T) -> AppResult<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match env::var(name) {
            Ok(val) => val
                .trim()
                .parse()
                .map_err(|e| AppError::ConfigError(format!("Invalid {name}: {e}"))),
            Err(_) => Ok(default),
        }
    }

    /// Parse CORS allowed origins from environment variable.
    fn parse_cors_origins() -> Vec<String> {
        env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Read `LOG_FORMAT` on its own, so logging can be set up before the
    /// rest of the configuration is loaded.
    pub fn log_format_from_env() -> AppResult<LogFormat> {
        match env::var("LOG_FORMAT") {
            Err(_) => Ok(LogFormat::Pretty),
            Ok(val) => match val.trim().to_ascii_lowercase().as_str() {
                "" | "pretty" => Ok(LogFormat::Pretty),
                "json" => Ok(LogFormat::Json),
                other => Err(AppError::ConfigError(format!(
                    "Invalid LOG_FORMAT: '{other}' (expected 'pretty' or 'json')"
                ))),
            },
        }
    }
}

/// Default configuration for testing and development.
///
/// Production deployments should use `Config::from_env()` instead.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Server
            host: "0.0.0.0".to_string(),
            port: 3000,
            // Identity service
            keystone_url: "http://localhost:5000/v3".to_string(),
            keystone_timeout: DEFAULT_VALIDATION_TIMEOUT,
            keystone_user_agent: DEFAULT_USER_AGENT.to_string(),
            // Token cache
            token_cache_enabled: true,
            token_cache_ttl: DEFAULT_CACHE_TTL,
            token_cache_max_entries: 10_000,
            token_cache_purge_interval: Duration::from_secs(60),
            // HTTP
            cors_allowed_origins: vec!["*".to_string()],
            // Observability
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_port: 9090,
        }
    }
}
