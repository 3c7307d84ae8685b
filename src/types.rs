use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use time::OffsetDateTime;

/// Opaque account attributes returned by a login endpoint.
pub type Profile = Map<String, JsonValue>;

/// Which login endpoint a session came from.
///
/// Serialized with the portal's role names (`"employer"` / `"employee"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountKind {
    /// Back-office account belonging to one or more employer organizations.
    #[serde(rename = "employer")]
    OrganizationMember,
    /// Job-seeker portal account.
    #[serde(rename = "employee")]
    Individual,
}

impl std::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::OrganizationMember => "organization",
            Self::Individual => "individual",
        })
    }
}

/// Tenant (employer organization) identifier.
///
/// The API is not consistent about numeric vs. string ids, so both are kept
/// in the form they arrived in and sent back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TenantId {
    Number(u64),
    Text(String),
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for TenantId {
    fn from(n: u64) -> Self {
        Self::Number(n)
    }
}

impl From<String> for TenantId {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

/// One organization offered to the user after an ambiguous back-office login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantCandidate {
    pub id: TenantId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Remaining display attributes, kept verbatim.
    #[serde(flatten)]
    pub attributes: Map<String, JsonValue>,
}

impl TenantCandidate {
    #[must_use]
    pub fn new(id: impl Into<TenantId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            attributes: Map::new(),
        }
    }
}

/// Tokens issued by a successful exchange. Opaque; never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl TokenPair {
    #[must_use]
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
        }
    }
}

/// Login identifier and secret.
///
/// The secret is redacted from `Debug` output and never persisted.
#[derive(Clone)]
pub struct Credentials {
    identifier: String,
    secret: String,
}

impl Credentials {
    #[must_use]
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }

    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    #[must_use]
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Job posting identifier used for the post-login return route.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct JobId(pub String);

/// Authenticated identity for the current client.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub account_kind: AccountKind,
    pub profile: Profile,
    /// Chosen employer; only set for organization members.
    pub selected_tenant: Option<TenantCandidate>,
    pub tokens: TokenPair,
    pub established_at: OffsetDateTime,
}

impl Session {
    #[must_use]
    pub fn new(
        account_kind: AccountKind,
        profile: Profile,
        selected_tenant: Option<TenantCandidate>,
        tokens: TokenPair,
    ) -> Self {
        Self {
            account_kind,
            profile,
            selected_tenant,
            tokens,
            established_at: OffsetDateTime::now_utc(),
        }
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.profile_str("name")
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.profile_str("email")
    }

    /// Account id from the profile; numeric ids are not converted.
    #[must_use]
    pub fn user_id(&self) -> Option<&JsonValue> {
        self.profile.get("id")
    }

    fn profile_str(&self, key: &str) -> Option<&str> {
        self.profile.get(key).and_then(JsonValue::as_str)
    }
}
