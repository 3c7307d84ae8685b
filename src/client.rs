use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use url::Url;

use crate::error::Error;
use crate::exchange::{CredentialExchange, Grant};
use crate::types::{AccountKind, Credentials, Profile, TenantCandidate, TenantId, TokenPair};

pub const DEFAULT_ORGANIZATION_LOGIN_PATH: &str = "auth/backOffice-login";
pub const DEFAULT_INDIVIDUAL_LOGIN_PATH: &str = "auth/portal-login";

/// Portal API login endpoints.
///
/// The base URL is a constructor parameter; login paths default to the
/// portal's back-office and portal routes and are resolved relative to it.
///
/// ```rust,ignore
/// use jobboard_accounts::ExchangeConfig;
///
/// let config = ExchangeConfig::new("https://api.jobboard.example/v1".parse()?)
///     .with_individual_path("auth/candidate-login");
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ExchangeConfig {
    pub(crate) base_url: Url,
    pub(crate) organization_path: String,
    pub(crate) individual_path: String,
}

impl ExchangeConfig {
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url: with_trailing_slash(base_url),
            organization_path: DEFAULT_ORGANIZATION_LOGIN_PATH.into(),
            individual_path: DEFAULT_INDIVIDUAL_LOGIN_PATH.into(),
        }
    }

    /// Override the back-office (organization member) login path.
    #[must_use]
    pub fn with_organization_path(mut self, path: impl Into<String>) -> Self {
        self.organization_path = path.into();
        self
    }

    /// Override the portal (individual) login path.
    #[must_use]
    pub fn with_individual_path(mut self, path: impl Into<String>) -> Self {
        self.individual_path = path.into();
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute login URL for an account kind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configured path does not form a valid URL.
    pub fn endpoint_url(&self, kind: AccountKind) -> Result<Url, Error> {
        let path = match kind {
            AccountKind::OrganizationMember => &self.organization_path,
            AccountKind::Individual => &self.individual_path,
        };
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::Config(format!("{kind} login path {path:?}: {e}")))
    }
}

/// Keeps `Url::join` from replacing the last segment of the base path.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// HTTP credential exchange against the portal API.
pub struct ExchangeClient {
    config: ExchangeConfig,
    http: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    user_name: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    org_id: Option<&'a TenantId>,
}

/// Success payload shared by both login endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    #[serde(default)]
    profile: Option<Profile>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    /// Entries are read one by one so an odd shape never fails the whole login.
    #[serde(default, alias = "employers")]
    tenants: Vec<JsonValue>,
}

impl LoginResponse {
    fn into_grant(self) -> Grant {
        Grant::new(
            self.profile.unwrap_or_default(),
            self.tenants.into_iter().filter_map(tenant_candidate).collect(),
            TokenPair::new(self.access_token.unwrap_or_default(), self.refresh_token),
        )
    }
}

/// Reads one employer entry.
///
/// The back office nests the organization as `{"tenant": {"id": ..}}`; that id
/// is the one it expects back as `orgId`. A top-level `id` is the fallback.
fn tenant_candidate(entry: JsonValue) -> Option<TenantCandidate> {
    let JsonValue::Object(mut attributes) = entry else {
        tracing::warn!("skipping employer entry that is not an object");
        return None;
    };

    let nested = attributes.get("tenant").and_then(JsonValue::as_object);
    let raw_id = nested
        .and_then(|tenant| tenant.get("id"))
        .or_else(|| attributes.get("id"))
        .cloned();
    let name = attributes
        .get("name")
        .or_else(|| nested.and_then(|tenant| tenant.get("name")))
        .and_then(JsonValue::as_str)
        .map(str::to_owned);

    let Some(id) = raw_id.and_then(|raw| serde_json::from_value::<TenantId>(raw).ok()) else {
        tracing::warn!("skipping employer entry without a usable id");
        return None;
    };

    attributes.remove("id");
    attributes.remove("name");
    Some(TenantCandidate {
        id,
        name,
        attributes,
    })
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl ExchangeClient {
    #[must_use]
    pub fn new(config: ExchangeConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (timeouts, proxies, connection reuse).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    /// Checks HTTP response status; returns the response on success or a rejection
    /// carrying the server's `message`, if any.
    async fn ensure_success(
        response: reqwest::Response,
        kind: AccountKind,
    ) -> Result<reqwest::Response, Error> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.message);
        Err(Error::Rejected {
            kind,
            status,
            message,
        })
    }
}

impl CredentialExchange for ExchangeClient {
    /// # Errors
    ///
    /// Returns [`Error::Transport`] on network failure, [`Error::Rejected`] if the
    /// endpoint answers with a non-success status, or [`Error::UnexpectedResponse`]
    /// if a success payload cannot be decoded.
    async fn exchange(
        &self,
        kind: AccountKind,
        credentials: &Credentials,
        tenant: Option<&TenantId>,
    ) -> Result<Grant, Error> {
        let url = self.config.endpoint_url(kind)?;
        let body = LoginRequest {
            user_name: credentials.identifier(),
            password: credentials.secret(),
            org_id: tenant,
        };

        let response = self.http.post(url).json(&body).send().await?;
        let response = Self::ensure_success(response, kind).await?;
        let body = response.bytes().await?;
        let payload: LoginResponse =
            serde_json::from_slice(&body).map_err(|e| Error::UnexpectedResponse {
                kind,
                detail: e.to_string(),
            })?;
        Ok(payload.into_grant())
    }
}
