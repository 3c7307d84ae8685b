use std::future::Future;

use crate::error::Error;
use crate::types::{AccountKind, Credentials, Profile, TenantCandidate, TenantId, TokenPair};

/// Fallback message when no attempt produced one.
pub const DEFAULT_LOGIN_ERROR: &str = "Invalid email or password. Please try again.";

/// Result of one accepted credential exchange.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct Grant {
    pub profile: Profile,
    /// Organizations the account belongs to. Empty for individual accounts.
    pub tenants: Vec<TenantCandidate>,
    pub tokens: TokenPair,
}

impl Grant {
    #[must_use]
    pub fn new(profile: Profile, tenants: Vec<TenantCandidate>, tokens: TokenPair) -> Self {
        Self {
            profile,
            tenants,
            tokens,
        }
    }

    /// Whether the caller must pick one tenant before the session is usable.
    #[must_use]
    pub fn needs_tenant_choice(&self) -> bool {
        self.tenants.len() > 1
    }

    /// Rejects grants that carry no access token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Rejected`] when the access token is empty.
    pub fn validated(self, kind: AccountKind) -> Result<Self, Error> {
        if self.tokens.access_token.is_empty() {
            return Err(Error::Rejected {
                kind,
                status: 200,
                message: None,
            });
        }
        Ok(self)
    }
}

/// A single credential exchange against the login endpoint for one account kind.
///
/// `tenant` is set only for the disambiguated back-office re-attempt.
pub trait CredentialExchange: Send + Sync {
    fn exchange(
        &self,
        kind: AccountKind,
        credentials: &Credentials,
        tenant: Option<&TenantId>,
    ) -> impl Future<Output = Result<Grant, Error>> + Send;
}

/// Which failure message to surface when every endpoint rejects the login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessagePrecedence {
    #[default]
    LastAttempt,
    FirstAttempt,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeOutcome {
    Granted { kind: AccountKind, grant: Grant },
    Exhausted { message: String },
}

/// Ordered list of account kinds to try for one login.
///
/// The first accepted exchange wins. Rejections and transport failures both
/// move on to the next kind; an accepted login with an unreadable payload
/// ends the attempt, since the account already matched that kind.
#[derive(Debug, Clone)]
pub struct FallbackPolicy {
    order: Vec<AccountKind>,
    precedence: MessagePrecedence,
    default_message: String,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            order: vec![AccountKind::OrganizationMember, AccountKind::Individual],
            precedence: MessagePrecedence::default(),
            default_message: DEFAULT_LOGIN_ERROR.into(),
        }
    }
}

impl FallbackPolicy {
    #[must_use]
    pub fn with_order(mut self, order: Vec<AccountKind>) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub fn with_message_precedence(mut self, precedence: MessagePrecedence) -> Self {
        self.precedence = precedence;
        self
    }

    #[must_use]
    pub fn with_default_message(mut self, message: impl Into<String>) -> Self {
        self.default_message = message.into();
        self
    }

    #[must_use]
    pub fn order(&self) -> &[AccountKind] {
        &self.order
    }

    #[must_use]
    pub fn default_message(&self) -> &str {
        &self.default_message
    }

    pub async fn run<X: CredentialExchange>(
        &self,
        exchange: &X,
        credentials: &Credentials,
    ) -> ExchangeOutcome {
        let mut messages = Vec::new();

        for &kind in &self.order {
            let attempt = exchange
                .exchange(kind, credentials, None)
                .await
                .and_then(|grant| grant.validated(kind));

            match attempt {
                Ok(grant) => {
                    tracing::debug!(%kind, "credential exchange accepted");
                    return ExchangeOutcome::Granted { kind, grant };
                }
                Err(e) if e.ends_fallback() => {
                    tracing::warn!(%kind, error = %e, "credential exchange accepted but unreadable");
                    messages.extend(e.user_message());
                    break;
                }
                Err(e) => {
                    tracing::debug!(%kind, error = %e, "credential exchange failed");
                    messages.extend(e.user_message());
                }
            }
        }

        let chosen = match self.precedence {
            MessagePrecedence::LastAttempt => messages.pop(),
            MessagePrecedence::FirstAttempt => messages.into_iter().next(),
        };

        ExchangeOutcome::Exhausted {
            message: chosen.unwrap_or_else(|| self.default_message.clone()),
        }
    }
}
