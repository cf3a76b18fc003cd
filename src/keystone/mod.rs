//! Identity service access.
//!
//! The middleware consumes validation through the [`TokenValidator`] trait;
//! [`KeystoneClient`] is the implementation that talks to a Keystone v3
//! endpoint over HTTP.

mod client;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ValidationError;
use crate::models::IdentityRecord;

pub use client::{KeystoneClient, interpret_response, status_line};

/// Default bound on a single validation round trip.
pub const DEFAULT_VALIDATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Agent string sent with every validation request.
pub const DEFAULT_USER_AGENT: &str = concat!("keystone-auth-middleware/", env!("CARGO_PKG_VERSION"));

/// Header carrying the caller's credential (also used to authenticate the lookup).
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// Header naming the token being introspected.
pub const SUBJECT_TOKEN_HEADER: &str = "x-subject-token";

/// Resolves a bearer token into the identity it was issued for.
///
/// One call, no retries: a failure means "could not confirm identity for
/// this request" and nothing more.
#[async_trait]
pub trait TokenValidator: Send + Sync + 'static {
    async fn validate(&self, token: &str) -> Result<IdentityRecord, ValidationError>;
}

/// Construction-time settings for [`KeystoneClient`].
#[derive(Debug, Clone)]
pub struct KeystoneClientOptions {
    /// Keystone v3 base URL, e.g. `http://keystone:5000/v3`
    pub endpoint: String,
    /// Total time allowed for one validation request
    pub timeout: Duration,
    pub user_agent: String,
}

impl KeystoneClientOptions {
    /// Options for `endpoint` with the default timeout and agent string.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: DEFAULT_VALIDATION_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// The token introspection URL derived from the endpoint.
    pub fn tokens_url(&self) -> String {
        format!(
            "{}/auth/tokens?nocatalog",
            self.endpoint.trim_end_matches('/')
        )
    }
}
