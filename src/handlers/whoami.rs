//! Example downstream handler.
//!
//! Shows the contract from the consuming side: the auth middleware only
//! asserts identity, so rejecting unauthenticated callers is this handler's
//! job, based on `X-Identity-Status`.

use axum::Json;
use axum::extract::Extension;
use axum::http::HeaderMap;
use tracing::instrument;

use crate::error::{AppError, AppResult};
use crate::middleware::IdentityStatus;
use crate::middleware::headers::{
    DOMAIN_ID, IDENTITY_STATUS, PROJECT_ID, PROJECT_NAME, ROLES, USER_ID,
};
use crate::models::{IdentityRecord, WhoAmIResponse};

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Report the identity the middleware attached to this request.
///
/// Returns 401 unless `X-Identity-Status` is `Confirmed`.
#[instrument(skip_all)]
pub async fn whoami(
    headers: HeaderMap,
    identity: Option<Extension<IdentityRecord>>,
) -> AppResult<Json<WhoAmIResponse>> {
    let status = header_string(&headers, IDENTITY_STATUS)
        .unwrap_or_else(|| IdentityStatus::Invalid.as_str().to_string());

    if status != IdentityStatus::Confirmed.as_str() {
        return Err(AppError::Unauthorized(
            "A valid X-Auth-Token is required".to_string(),
        ));
    }

    let roles = header_string(&headers, ROLES)
        .map(|roles| {
            roles
                .split(',')
                .filter(|r| !r.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let identity = identity.map(|Extension(identity)| identity).unwrap_or_default();

    Ok(Json(WhoAmIResponse {
        identity_status: status,
        user_id: header_string(&headers, USER_ID),
        user_name: Some(identity.user.name).filter(|n| !n.is_empty()),
        project_id: header_string(&headers, PROJECT_ID),
        project_name: header_string(&headers, PROJECT_NAME),
        domain_id: header_string(&headers, DOMAIN_ID),
        roles,
        expires_at: Some(identity.expires_at).filter(|e| !e.is_empty()),
    }))
}
