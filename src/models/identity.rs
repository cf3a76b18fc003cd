//! Identity record returned by a successful token validation.
//!
//! These types mirror the `token` object of a Keystone v3
//! `GET /auth/tokens` response. Every field tolerates being missing or
//! `null` in the JSON document: scalars fall back to their zero value while
//! the optional sub-records (`project`, `domain`, `roles`) stay `None`, so
//! an absent record can always be told apart from a present-but-empty one.

use serde::{Deserialize, Deserializer, Serialize};

/// Deserialize `null` the same way as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Validated token context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    /// Expiry timestamp as sent by the authority (not reparsed)
    #[serde(default, deserialize_with = "null_as_default")]
    pub expires_at: String,

    /// Issue timestamp as sent by the authority (not reparsed)
    #[serde(default, deserialize_with = "null_as_default")]
    pub issued_at: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub user: User,

    /// Present for project-scoped tokens
    #[serde(default)]
    pub project: Option<Project>,

    /// Present for domain-scoped tokens
    #[serde(default)]
    pub domain: Option<Domain>,

    /// Role assignments in the order the authority listed them
    #[serde(default)]
    pub roles: Option<Vec<Role>>,
}

/// The user a token was issued to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub enabled: bool,

    /// Owning domain id, when the authority sends it flat
    #[serde(default)]
    pub domain_id: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub domain: DomainRef,
}

impl User {
    /// Owning domain id: the flat `domain_id` if the authority sent one,
    /// otherwise the nested `domain.id`.
    pub fn owning_domain_id(&self) -> &str {
        self.domain_id.as_deref().unwrap_or(self.domain.id.as_str())
    }
}

/// A project-scoped token's project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub enabled: bool,

    #[serde(default)]
    pub domain_id: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub domain: DomainRef,
}

impl Project {
    /// Owning domain id, preferring the flat `domain_id`.
    pub fn owning_domain_id(&self) -> &str {
        self.domain_id.as_deref().unwrap_or(self.domain.id.as_str())
    }
}

/// A domain-scoped token's domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub enabled: bool,
}

/// Domain reference embedded in users and projects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRef {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

impl IdentityRecord {
    /// Role names in authority order.
    pub fn role_names(&self) -> Option<Vec<&str>> {
        self.roles
            .as_ref()
            .map(|roles| roles.iter().map(|r| r.name.as_str()).collect())
    }
}
