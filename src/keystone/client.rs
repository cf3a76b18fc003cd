use std::time::Instant;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{instrument, trace};

use super::{AUTH_TOKEN_HEADER, KeystoneClientOptions, SUBJECT_TOKEN_HEADER, TokenValidator};
use crate::error::{AppError, AppResult, ValidationError};
use crate::metrics;
use crate::models::{AuthResponse, IdentityRecord};

/// HTTP client for Keystone v3 token validation.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct KeystoneClient {
    http: reqwest::Client,
    tokens_url: String,
}

impl KeystoneClient {
    /// Build a client from options.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ClientBuild` if the HTTP client cannot be created
    /// (e.g. the TLS backend fails to initialize).
    pub fn new(options: KeystoneClientOptions) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .user_agent(options.user_agent.as_str())
            .build()
            .map_err(AppError::ClientBuild)?;

        Ok(Self {
            tokens_url: options.tokens_url(),
            http,
        })
    }

    /// URL every validation request is sent to.
    pub fn tokens_url(&self) -> &str {
        &self.tokens_url
    }
}

#[async_trait]
impl TokenValidator for KeystoneClient {
    #[instrument(skip_all, name = "keystone.validate")]
    async fn validate(&self, token: &str) -> Result<IdentityRecord, ValidationError> {
        let started = Instant::now();

        // The token authenticates the lookup and is also its subject
        let result = async {
            let response = self
                .http
                .get(&self.tokens_url)
                .header(AUTH_TOKEN_HEADER, token)
                .header(SUBJECT_TOKEN_HEADER, token)
                .send()
                .await?;
            let status = response.status();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, body))
        }
        .await;

        // Failed round trips are timed too
        metrics::record_validation_duration(started.elapsed().as_secs_f64());
        let (status, body) = result.map_err(ValidationError::Transport)?;
        trace!(%status, body_len = body.len(), "Identity service responded");

        interpret_response(status, &body)
    }
}

/// Status line carried by `Authority` errors, e.g. `401 Unauthorized`.
///
/// Uses the canonical reason phrase; codes without one render as the bare
/// number rather than `StatusCode`'s `<unknown status code>` placeholder.
pub fn status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {reason}", status.as_u16()),
        None => status.as_u16().to_string(),
    }
}

/// Turn a raw identity service response into an identity or an error.
///
/// The body is decoded first, so an undecodable body is a `Decode` error
/// whatever the status. After that an explicit error object wins over the
/// status code, and a 200 without a token is a protocol violation.
pub fn interpret_response(
    status: StatusCode,
    body: &[u8],
) -> Result<IdentityRecord, ValidationError> {
    let response: AuthResponse = serde_json::from_slice(body).map_err(ValidationError::Decode)?;

    if let Some(error) = response.error {
        return Err(ValidationError::Authority {
            status: status_line(status),
            message: Some(error.message),
        });
    }

    if status != StatusCode::OK {
        return Err(ValidationError::Authority {
            status: status_line(status),
            message: None,
        });
    }

    response
        .token
        .ok_or(ValidationError::Protocol("response missing token context"))
}
