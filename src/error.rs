use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Reasons a token could not be confirmed by the identity service.
///
/// None of these ever fail the request pipeline: the middleware logs them,
/// counts them and lets the request continue with `X-Identity-Status: Invalid`.
///
/// - `Transport` - the identity service could not be reached (refused, DNS, timeout, cancelled)
/// - `Decode` - the response body was not the expected JSON document
/// - `Authority` - the identity service rejected the token or answered non-200
/// - `Protocol` - a 200 response that carried no token context
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("identity service unreachable: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("malformed identity service response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("identity service rejected token: {}", authority_detail(.status, .message))]
    Authority {
        /// Status line, e.g. `401 Unauthorized`
        status: String,
        /// Message from the authority's error object, if it sent one
        message: Option<String>,
    },

    #[error("identity service protocol error: {0}")]
    Protocol(&'static str),
}

fn authority_detail(status: &str, message: &Option<String>) -> String {
    match message {
        Some(message) => format!("{status} : {message}"),
        None => status.to_string(),
    }
}

impl ValidationError {
    /// Stable label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::Transport(_) => "transport",
            ValidationError::Decode(_) => "decode",
            ValidationError::Authority { .. } => "authority",
            ValidationError::Protocol(_) => "protocol",
        }
    }

    /// Whether the underlying transport failure was the request timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ValidationError::Transport(e) if e.is_timeout())
    }
}

/// Application-level errors for the demo server and configuration loading.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Failed to build identity service client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

/// Error response body for API endpoints.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AppError::ConfigError(_) | AppError::ClientBuild(_) => {
                // Full details stay in the server log
                tracing::error!(error = %self, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred. Please contact support if the issue persists.",
                )
            }
            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "unauthorized", msg.as_str())
            }
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message: message.to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
