mod api;
mod identity;

pub use api::{AuthResponse, AuthorityErrorBody, HealthResponse, WhoAmIResponse};
pub use identity::{Domain, DomainRef, IdentityRecord, Project, Role, User};
