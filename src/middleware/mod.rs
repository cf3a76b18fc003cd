//! HTTP middleware for Keystone token authentication.
//!
//! - **Header sanitization**: identity headers a caller sends are always removed
//! - **Token validation**: `X-Auth-Token` checked against the identity service,
//!   with an optional token cache in front
//! - **Header projection**: confirmed identities are written back as `X-User-*`,
//!   `X-Project-*`, `X-Domain-*` and `X-Roles` headers
//!
//! # Architecture
//!
//! ```text
//! Request → Strip identity headers → Cache / Keystone → Project headers → Handler
//!                                        ↓
//!                               X-Identity-Status: Confirmed | Invalid
//! ```
//!
//! The middleware only asserts identity. It never returns an error response
//! itself; authorization is left to the downstream handler.

pub mod headers;
pub mod keystone;

pub use headers::{DENY_LIST, IdentityStatus, project_identity, strip_identity_headers};
pub use keystone::{AuthOutcome, Authenticator, KeystoneAuthLayer, KeystoneAuthService};
