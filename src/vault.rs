use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::Error;
use crate::store::{KeyValueStore, StoreKey};
use crate::types::{AccountKind, Profile, Session, TenantCandidate, TokenPair};

/// Shape of the `user` entry. Tokens live under their own keys.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredUser {
    role: AccountKind,
    #[serde(default)]
    profile: Profile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    selected_tenant: Option<TenantCandidate>,
    #[serde(with = "time::serde::rfc3339")]
    established_at: OffsetDateTime,
}

/// Persistence policy for sessions on top of a [`KeyValueStore`].
///
/// Decides which keys a finished session writes, which keys a pending tenant
/// choice writes, and what hydration accepts.
#[derive(Debug)]
pub struct SessionVault<S> {
    store: S,
}

impl<S: KeyValueStore> SessionVault<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Persist a finished session and drop any pending tenant candidates.
    ///
    /// # Errors
    ///
    /// Returns the store's error if a write fails.
    pub fn save_session(&self, session: &Session) -> Result<(), Error> {
        let user = StoredUser {
            role: session.account_kind,
            profile: session.profile.clone(),
            selected_tenant: session.selected_tenant.clone(),
            established_at: session.established_at,
        };

        self.store
            .put(StoreKey::User, &serde_json::to_string(&user)?)?;
        self.save_tokens(&session.tokens)?;
        self.store.remove(StoreKey::PendingTenantCandidates)
    }

    /// Persist tokens and the candidate list of an unresolved organization login.
    ///
    /// `user` is removed so the pending state never reads as logged in.
    ///
    /// # Errors
    ///
    /// Returns the store's error if a write fails.
    pub fn save_pending(
        &self,
        tokens: &TokenPair,
        candidates: &[TenantCandidate],
    ) -> Result<(), Error> {
        self.store.remove(StoreKey::User)?;
        self.save_tokens(tokens)?;
        self.store.put(
            StoreKey::PendingTenantCandidates,
            &serde_json::to_string(candidates)?,
        )
    }

    fn save_tokens(&self, tokens: &TokenPair) -> Result<(), Error> {
        self.store.put(StoreKey::AccessToken, &tokens.access_token)?;
        match &tokens.refresh_token {
            Some(refresh) => self.store.put(StoreKey::RefreshToken, refresh),
            None => self.store.remove(StoreKey::RefreshToken),
        }
    }

    /// Hydrate the stored session.
    ///
    /// Malformed or incomplete state is logged and cleared rather than returned
    /// as an error.
    ///
    /// # Errors
    ///
    /// Returns the store's error if reading or clearing fails.
    pub fn load_session(&self) -> Result<Option<Session>, Error> {
        match self.read_session() {
            Ok(Some(session)) => Ok(Some(session)),
            Ok(None) => {
                if self.has_leftovers()? {
                    tracing::warn!("discarding session entries without a stored user");
                    self.clear()?;
                }
                Ok(None)
            }
            Err(Error::MalformedStoredSession(reason)) => {
                tracing::warn!(%reason, "clearing malformed stored session");
                self.clear()?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn read_session(&self) -> Result<Option<Session>, Error> {
        let Some(raw_user) = self.store.get(StoreKey::User)? else {
            return Ok(None);
        };

        let user: StoredUser = serde_json::from_str(&raw_user)
            .map_err(|e| Error::MalformedStoredSession(format!("user: {e}")))?;

        let access_token = self
            .store
            .get(StoreKey::AccessToken)?
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::MalformedStoredSession("missing access token".into()))?;

        if user.role == AccountKind::Individual && user.selected_tenant.is_some() {
            return Err(Error::MalformedStoredSession(
                "individual session with a selected tenant".into(),
            ));
        }

        Ok(Some(Session {
            account_kind: user.role,
            profile: user.profile,
            selected_tenant: user.selected_tenant,
            tokens: TokenPair::new(access_token, self.store.get(StoreKey::RefreshToken)?),
            established_at: user.established_at,
        }))
    }

    fn has_leftovers(&self) -> Result<bool, Error> {
        for key in StoreKey::SESSION_KEYS {
            if self.store.get(key)?.is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Remove every session key. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns the store's error if a removal fails.
    pub fn clear(&self) -> Result<(), Error> {
        for key in StoreKey::SESSION_KEYS {
            self.store.remove(key)?;
        }
        Ok(())
    }
}
