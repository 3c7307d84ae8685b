use std::path::PathBuf;

use url::Url;

use crate::client::{ExchangeClient, ExchangeConfig};
use crate::error::Error;
use crate::exchange::{FallbackPolicy, MessagePrecedence};
use crate::notify::Notifier;
use crate::orchestrator::SessionOrchestrator;
use crate::store::{FileStore, KeyValueStore, MemoryStore};

/// Orchestrator assembled by [`PortalConfig::build`].
pub type PortalSession<N> = SessionOrchestrator<ExchangeClient, Box<dyn KeyValueStore>, N>;

/// Portal login configuration.
///
/// Required field (`base_url`) is a constructor parameter.
///
/// Use [`from_env()`](PortalConfig::from_env) for convention-based setup,
/// or [`new()`](PortalConfig::new) with `with_*` methods for full control.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    exchange: ExchangeConfig,
    session_file: Option<PathBuf>,
    precedence: MessagePrecedence,
    http: Option<reqwest::Client>,
}

impl PortalConfig {
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            exchange: ExchangeConfig::new(base_url),
            session_file: None,
            precedence: MessagePrecedence::default(),
            http: None,
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `JOBBOARD_API_BASE_URL`: portal API base URL
    ///
    /// # Optional env vars
    /// - `JOBBOARD_ORG_LOGIN_PATH`: override the back-office login path
    /// - `JOBBOARD_INDIVIDUAL_LOGIN_PATH`: override the portal login path
    /// - `JOBBOARD_SESSION_FILE`: persist the session to this file (in-memory otherwise)
    /// - `JOBBOARD_LOGIN_ERROR_PRECEDENCE`: `last` (default) or `first`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the base URL is missing or a value is invalid.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let base_url_str = lookup("JOBBOARD_API_BASE_URL")
            .ok_or_else(|| Error::Config("JOBBOARD_API_BASE_URL is required".into()))?;
        let base_url: Url = base_url_str
            .parse()
            .map_err(|e| Error::Config(format!("JOBBOARD_API_BASE_URL: {e}")))?;

        let mut config = Self::new(base_url);

        if let Some(path) = lookup("JOBBOARD_ORG_LOGIN_PATH") {
            config = config.with_organization_path(path);
        }
        if let Some(path) = lookup("JOBBOARD_INDIVIDUAL_LOGIN_PATH") {
            config = config.with_individual_path(path);
        }
        if let Some(path) = lookup("JOBBOARD_SESSION_FILE").filter(|p| !p.is_empty()) {
            config = config.with_session_file(path);
        }
        if let Some(value) = lookup("JOBBOARD_LOGIN_ERROR_PRECEDENCE") {
            let precedence = match value.trim().to_ascii_lowercase().as_str() {
                "last" => MessagePrecedence::LastAttempt,
                "first" => MessagePrecedence::FirstAttempt,
                other => {
                    return Err(Error::Config(format!(
                        "JOBBOARD_LOGIN_ERROR_PRECEDENCE: expected `last` or `first`, got `{other}`"
                    )));
                }
            };
            config = config.with_message_precedence(precedence);
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_organization_path(mut self, path: impl Into<String>) -> Self {
        self.exchange = self.exchange.with_organization_path(path);
        self
    }

    #[must_use]
    pub fn with_individual_path(mut self, path: impl Into<String>) -> Self {
        self.exchange = self.exchange.with_individual_path(path);
        self
    }

    #[must_use]
    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_message_precedence(mut self, precedence: MessagePrecedence) -> Self {
        self.precedence = precedence;
        self
    }

    /// Use a custom HTTP client (timeouts, proxies, connection reuse).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = Some(client);
        self
    }

    #[must_use]
    pub fn exchange(&self) -> &ExchangeConfig {
        &self.exchange
    }

    #[must_use]
    pub fn session_file(&self) -> Option<&PathBuf> {
        self.session_file.as_ref()
    }

    #[must_use]
    pub fn fallback_policy(&self) -> FallbackPolicy {
        FallbackPolicy::default().with_message_precedence(self.precedence)
    }

    #[must_use]
    pub fn exchange_client(&self) -> ExchangeClient {
        let client = ExchangeClient::new(self.exchange.clone());
        match &self.http {
            Some(http) => client.with_http_client(http.clone()),
            None => client,
        }
    }

    /// File-backed store when a session file is configured, in-memory otherwise.
    #[must_use]
    pub fn open_store(&self) -> Box<dyn KeyValueStore> {
        match &self.session_file {
            Some(path) => Box::new(FileStore::new(path.clone())),
            None => Box::new(MemoryStore::new()),
        }
    }

    /// Assemble an orchestrator, restoring any stored session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be read.
    pub fn build<N: Notifier>(self, notifier: N) -> Result<PortalSession<N>, Error> {
        let orchestrator =
            SessionOrchestrator::new(self.exchange_client(), self.open_store(), notifier)?;
        Ok(orchestrator.with_policy(self.fallback_policy()))
    }
}
