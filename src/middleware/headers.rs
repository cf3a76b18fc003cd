//! Identity header names, inbound sanitization and outbound projection.
//!
//! Everything this middleware can assert about a caller travels downstream
//! as plain request headers, so any such header a caller sent itself must be
//! removed before a trust decision is made. [`strip_identity_headers`] does
//! that; [`project_identity`] computes the headers to add back once an
//! identity has been confirmed.

use std::collections::BTreeMap;

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use tracing::warn;

use crate::models::IdentityRecord;

pub const IDENTITY_STATUS: &str = "x-identity-status";
pub const USER_ID: &str = "x-user-id";
pub const USER_DOMAIN_ID: &str = "x-user-domain-id";
pub const USER_DOMAIN_NAME: &str = "x-user-domain-name";
pub const PROJECT_ID: &str = "x-project-id";
pub const PROJECT_NAME: &str = "x-project-name";
pub const PROJECT_DOMAIN_ID: &str = "x-project-domain-id";
pub const PROJECT_DOMAIN_NAME: &str = "x-project-domain-name";
pub const DOMAIN_ID: &str = "x-domain-id";
pub const DOMAIN_NAME: &str = "x-domain-name";
pub const ROLES: &str = "x-roles";

/// Headers stripped from every inbound request.
///
/// Covers the identity headers set by this middleware, their service-token
/// counterparts, the catalog header (including the historical misspelling)
/// and deprecated tenant-era names.
pub const DENY_LIST: [&str; 30] = [
    "x-identity-status",
    "x-service-identity-status",
    "x-domain-id",
    "x-service-domain-id",
    "x-domain-name",
    "x-service-domain-name",
    "x-project-id",
    "x-service-project-id",
    "x-project-name",
    "x-service-project-name",
    "x-project-domain-id",
    "x-service-project-domain-id",
    "x-project-domain-name",
    "x-service-project-domain-name",
    "x-user-id",
    "x-service-user-id",
    "x-user-name",
    "x-service-user-name",
    "x-user-domain-id",
    "x-service-user-domain-id",
    "x-user-domain-name",
    "x-service-user-domain-name",
    "x-roles",
    "x-service-roles",
    "x-service-catalog",
    "x-servie-catalog",
    // deprecated
    "x-tenant-id",
    "x-tenant",
    "x-user",
    "x-role",
];

/// Value of `X-Identity-Status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityStatus {
    Confirmed,
    Invalid,
}

impl IdentityStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            IdentityStatus::Confirmed => "Confirmed",
            IdentityStatus::Invalid => "Invalid",
        }
    }

    pub fn header_value(self) -> HeaderValue {
        HeaderValue::from_static(self.as_str())
    }
}

/// Remove every deny-listed header, including repeated values.
pub fn strip_identity_headers(headers: &mut HeaderMap) {
    for name in DENY_LIST {
        // drops every value for the name, not just the first
        headers.remove(name);
    }
}

/// Headers asserting the facts in `identity`.
///
/// Pure and deterministic. Optional sub-records that are absent produce no
/// headers at all; present ones produce their headers even when the values
/// are empty strings.
pub fn project_identity(identity: &IdentityRecord) -> BTreeMap<&'static str, String> {
    let mut headers = BTreeMap::new();

    headers.insert(USER_ID, identity.user.id.clone());
    headers.insert(USER_DOMAIN_ID, identity.user.owning_domain_id().to_string());
    headers.insert(USER_DOMAIN_NAME, identity.user.domain.name.clone());

    if let Some(project) = &identity.project {
        headers.insert(PROJECT_NAME, project.name.clone());
        headers.insert(PROJECT_ID, project.id.clone());
        headers.insert(PROJECT_DOMAIN_NAME, project.domain.name.clone());
        headers.insert(PROJECT_DOMAIN_ID, project.owning_domain_id().to_string());
    }

    if let Some(domain) = &identity.domain {
        headers.insert(DOMAIN_ID, domain.id.clone());
        headers.insert(DOMAIN_NAME, domain.name.clone());
    }

    if let Some(names) = identity.role_names() {
        headers.insert(ROLES, names.join(","));
    }

    headers
}

/// Write projected identity headers into `headers`, replacing existing values.
///
/// Values that are not legal header values are skipped with a warning.
pub fn apply_identity_headers(headers: &mut HeaderMap, projected: BTreeMap<&'static str, String>) {
    for (name, value) in projected {
        match HeaderValue::try_from(value) {
            Ok(value) => {
                headers.insert(HeaderName::from_static(name), value);
            }
            Err(_) => {
                warn!(header = name, "Identity value not representable as a header, skipped");
            }
        }
    }
}
