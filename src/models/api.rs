use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::IdentityRecord;
use super::identity::null_as_default;

/// Body of a Keystone `GET /auth/tokens` response.
///
/// Either member may be absent or `null`; the validator decides which
/// combination constitutes success.
#[derive(Debug, Default, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub token: Option<IdentityRecord>,
    #[serde(default)]
    pub error: Option<AuthorityErrorBody>,
}

/// Error object the identity service attaches to rejected requests.
#[derive(Debug, Default, Deserialize)]
pub struct AuthorityErrorBody {
    #[serde(default, deserialize_with = "null_as_default")]
    pub code: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service health status
    pub status: String,
    /// Service version
    pub version: String,
    /// Whether the in-memory token cache is enabled
    pub cache_enabled: bool,
    /// Number of cached identities (0 when caching is disabled)
    pub cache_entries: usize,
    /// Uptime in seconds
    pub uptime_seconds: u64,
    /// Current timestamp
    pub timestamp: DateTime<Utc>,
}

/// What the downstream handler saw after the auth middleware ran.
#[derive(Debug, Serialize)]
pub struct WhoAmIResponse {
    /// Value of `X-Identity-Status`
    pub identity_status: String,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub project_id: Option<String>,
    pub project_name: Option<String>,
    pub domain_id: Option<String>,
    pub roles: Vec<String>,
    /// Token expiry as reported by the identity service
    pub expires_at: Option<String>,
}
