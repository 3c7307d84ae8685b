//! Session state machine for the portal login flow.
//!
//! ```text
//! LoggedOut ──login──▶ Authenticating ──▶ LoggedIn
//!                           │
//!                           └──▶ AwaitingTenantChoice ──select_employer──▶ LoggedIn
//!                                       │
//!                                       └──cancel_selection──▶ LoggedOut
//! ```
//!
//! `logout` returns to `LoggedOut` from any state. The orchestrator never
//! navigates; callers react to the returned outcome and [`AuthStatus`].

use crate::error::Error;
use crate::exchange::{CredentialExchange, ExchangeOutcome, FallbackPolicy};
use crate::navigation;
use crate::notify::{Notice, Notifier};
use crate::store::KeyValueStore;
use crate::types::{AccountKind, Credentials, JobId, Profile, Session, TenantCandidate, TenantId};
use crate::vault::SessionVault;

const ORGANIZATION_LOGIN_MESSAGE: &str = "Login successful! Redirecting...";
const INDIVIDUAL_LOGIN_MESSAGE: &str = "Login successful!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    LoggedOut,
    Authenticating,
    AwaitingTenantChoice,
    LoggedIn,
}

/// Result of `login` or `select_employer`.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum LoginOutcome {
    LoggedIn {
        account_kind: AccountKind,
        message: String,
    },
    /// Several employers match; call `select_employer` or `cancel_selection`.
    TenantChoiceRequired { candidates: Vec<TenantCandidate> },
    Failed { message: String },
}

impl LoginOutcome {
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        matches!(self, Self::LoggedIn { .. })
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::LoggedIn { message, .. } | Self::Failed { message } => Some(message),
            Self::TenantChoiceRequired { .. } => None,
        }
    }
}

/// Credentials are held only while the choice is open; they are needed to
/// re-issue the exchange with the chosen tenant.
struct PendingSelection {
    credentials: Credentials,
    candidates: Vec<TenantCandidate>,
}

enum Phase {
    LoggedOut,
    Authenticating,
    AwaitingTenantChoice(PendingSelection),
    LoggedIn(Session),
}

/// Owns the current session for one client.
///
/// Built once at the application's composition root and passed to whatever
/// needs it. All transitions take `&mut self`, so overlapping logins on one
/// instance do not compile.
pub struct SessionOrchestrator<X, S, N> {
    exchange: X,
    vault: SessionVault<S>,
    notifier: N,
    policy: FallbackPolicy,
    phase: Phase,
}

impl<X, S, N> SessionOrchestrator<X, S, N>
where
    X: CredentialExchange,
    S: KeyValueStore,
    N: Notifier,
{
    /// Create an orchestrator, hydrating any session left in `store`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store itself fails. Malformed stored data
    /// is cleared and the orchestrator starts logged out.
    pub fn new(exchange: X, store: S, notifier: N) -> Result<Self, Error> {
        let vault = SessionVault::new(store);
        let phase = match vault.load_session()? {
            Some(session) => {
                tracing::debug!(account_kind = %session.account_kind, "restored stored session");
                Phase::LoggedIn(session)
            }
            None => Phase::LoggedOut,
        };

        Ok(Self {
            exchange,
            vault,
            notifier,
            policy: FallbackPolicy::default(),
            phase,
        })
    }

    #[must_use]
    pub fn with_policy(mut self, policy: FallbackPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn status(&self) -> AuthStatus {
        match self.phase {
            Phase::LoggedOut => AuthStatus::LoggedOut,
            Phase::Authenticating => AuthStatus::Authenticating,
            Phase::AwaitingTenantChoice(_) => AuthStatus::AwaitingTenantChoice,
            Phase::LoggedIn(_) => AuthStatus::LoggedIn,
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self.phase, Phase::LoggedIn(_))
    }

    /// The current user, once fully logged in.
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        match &self.phase {
            Phase::LoggedIn(session) => Some(session),
            _ => None,
        }
    }

    /// Employers to choose from while a selection is pending.
    #[must_use]
    pub fn tenant_candidates(&self) -> Option<&[TenantCandidate]> {
        match &self.phase {
            Phase::AwaitingTenantChoice(pending) => Some(&pending.candidates),
            _ => None,
        }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        self.vault.store()
    }

    #[must_use]
    pub fn policy(&self) -> &FallbackPolicy {
        &self.policy
    }

    /// Log in with credentials that may belong to either account kind.
    ///
    /// Endpoint failures are reported as [`LoginOutcome::Failed`] and leave
    /// the previous state and the store untouched.
    ///
    /// # Errors
    ///
    /// Returns an error only if persisting the new session or the pending
    /// employer choice fails; the orchestrator is then logged out.
    pub async fn login(&mut self, credentials: Credentials) -> Result<LoginOutcome, Error> {
        let previous = std::mem::replace(&mut self.phase, Phase::Authenticating);

        let (kind, grant) = match self.policy.run(&self.exchange, &credentials).await {
            ExchangeOutcome::Granted { kind, grant } => (kind, grant),
            ExchangeOutcome::Exhausted { message } => {
                self.phase = previous;
                tracing::info!(identifier = %credentials.identifier(), "login failed on every endpoint");
                self.notifier.notify(Notice::error(&message));
                return Ok(LoginOutcome::Failed { message });
            }
        };

        if kind == AccountKind::OrganizationMember && grant.needs_tenant_choice() {
            if let Err(e) = self.vault.save_pending(&grant.tokens, &grant.tenants) {
                return Err(self.abandon(e));
            }
            tracing::info!(candidates = grant.tenants.len(), "login needs an employer choice");
            let candidates = grant.tenants.clone();
            self.phase = Phase::AwaitingTenantChoice(PendingSelection {
                credentials,
                candidates: grant.tenants,
            });
            return Ok(LoginOutcome::TenantChoiceRequired { candidates });
        }

        let selected_tenant = match kind {
            AccountKind::OrganizationMember => grant.tenants.into_iter().next(),
            AccountKind::Individual => None,
        };
        let message = match kind {
            AccountKind::OrganizationMember => ORGANIZATION_LOGIN_MESSAGE,
            AccountKind::Individual => INDIVIDUAL_LOGIN_MESSAGE,
        };

        let session = Session::new(kind, grant.profile, selected_tenant, grant.tokens);
        self.establish(session, message)
    }

    /// Finish a pending organization login with one of the offered employers.
    ///
    /// A rejected re-exchange keeps the selection open.
    ///
    /// # Errors
    ///
    /// - [`Error::NoPendingSelection`] outside `AwaitingTenantChoice`.
    /// - [`Error::InvalidTenantChoice`] if `tenant` was not offered; nothing changes.
    /// - Store errors while persisting the session.
    pub async fn select_employer(&mut self, tenant: &TenantId) -> Result<LoginOutcome, Error> {
        let Phase::AwaitingTenantChoice(pending) = &self.phase else {
            return Err(Error::NoPendingSelection);
        };
        let Some(candidate) = pending.candidates.iter().find(|c| &c.id == tenant).cloned() else {
            tracing::warn!(%tenant, "employer choice not among candidates");
            return Err(Error::InvalidTenantChoice(tenant.clone()));
        };
        let credentials = pending.credentials.clone();

        let kind = AccountKind::OrganizationMember;
        let attempt = self
            .exchange
            .exchange(kind, &credentials, Some(&candidate.id))
            .await
            .and_then(|grant| grant.validated(kind));

        match attempt {
            Ok(grant) => {
                let session = Session::new(kind, grant.profile, Some(candidate), grant.tokens);
                self.establish(session, ORGANIZATION_LOGIN_MESSAGE)
            }
            Err(e) => {
                tracing::warn!(%tenant, error = %e, "employer login failed");
                let message = e
                    .user_message()
                    .unwrap_or_else(|| self.policy.default_message().to_owned());
                self.notifier.notify(Notice::error(&message));
                Ok(LoginOutcome::Failed { message })
            }
        }
    }

    /// Abandon a pending employer choice, discarding the partially stored login.
    ///
    /// # Errors
    ///
    /// [`Error::NoPendingSelection`] outside `AwaitingTenantChoice`, or a store error.
    pub fn cancel_selection(&mut self) -> Result<(), Error> {
        if !matches!(self.phase, Phase::AwaitingTenantChoice(_)) {
            return Err(Error::NoPendingSelection);
        }
        self.phase = Phase::LoggedOut;
        self.vault.clear()?;
        tracing::info!("employer selection cancelled");
        Ok(())
    }

    /// Drop the session from memory and storage. Safe to call when logged out.
    ///
    /// # Errors
    ///
    /// Returns the store's error if clearing fails; the orchestrator is
    /// logged out regardless.
    pub fn logout(&mut self) -> Result<(), Error> {
        let was_logged_in = self.is_authenticated();
        self.phase = Phase::LoggedOut;
        self.vault.clear()?;
        if was_logged_in {
            tracing::info!("logged out");
        }
        Ok(())
    }

    /// Replace the profile of the current session (e.g. after an account refresh).
    ///
    /// # Errors
    ///
    /// [`Error::NotAuthenticated`] when not logged in, or a store error.
    pub fn update_profile(&mut self, profile: Profile) -> Result<(), Error> {
        let Phase::LoggedIn(session) = &mut self.phase else {
            return Err(Error::NotAuthenticated);
        };
        session.profile = profile;
        self.vault.save_session(session)
    }

    /// Remember a job application to resume after the next job-seeker login.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the write fails.
    pub fn remember_return_to_job(&self, job: &JobId) -> Result<(), Error> {
        navigation::remember_return_to_job(self.vault.store(), job)
    }

    /// Where the caller should navigate now that the user is logged in.
    ///
    /// `None` unless logged in. Consumes a remembered job application.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the remembered job cannot be read or removed.
    pub fn post_login_route(&self) -> Result<Option<String>, Error> {
        match &self.phase {
            Phase::LoggedIn(session) => {
                navigation::post_login_route(self.vault.store(), session).map(Some)
            }
            _ => Ok(None),
        }
    }

    fn establish(&mut self, session: Session, message: &str) -> Result<LoginOutcome, Error> {
        if let Err(e) = self.vault.save_session(&session) {
            return Err(self.abandon(e));
        }

        let account_kind = session.account_kind;
        tracing::info!(
            %account_kind,
            tenant = ?session.selected_tenant.as_ref().map(|t| &t.id),
            "login successful"
        );
        self.phase = Phase::LoggedIn(session);
        self.notifier.notify(Notice::success(message));

        Ok(LoginOutcome::LoggedIn {
            account_kind,
            message: message.to_owned(),
        })
    }

    /// Falls back to `LoggedOut` after a failed write, clearing what was written.
    fn abandon(&mut self, error: Error) -> Error {
        tracing::error!(error = %error, "failed to persist session");
        self.phase = Phase::LoggedOut;
        if let Err(e) = self.vault.clear() {
            tracing::warn!(error = %e, "failed to clear session store");
        }
        error
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

    use super::*;
    use crate::exchange::testing::{Reply, ScriptedExchange, grant};
    use crate::notify::Severity;
    use crate::store::{MemoryStore, StoreKey};

    type Orchestrator = SessionOrchestrator<ScriptedExchange, Arc<MemoryStore>, UnboundedSender<Notice>>;

    fn acme_tenants() -> Vec<TenantCandidate> {
        vec![TenantCandidate::new(1, "Acme US"), TenantCandidate::new(2, "Acme EU")]
    }

    fn orchestrator(
        exchange: ScriptedExchange,
    ) -> (Orchestrator, Arc<MemoryStore>, UnboundedReceiver<Notice>) {
        let store = Arc::new(MemoryStore::new());
        let (tx, rx) = unbounded_channel();
        let orch = SessionOrchestrator::new(exchange, store.clone(), tx).unwrap();
        (orch, store, rx)
    }

    fn multi_tenant_exchange() -> ScriptedExchange {
        ScriptedExchange::default()
            .on(
                AccountKind::OrganizationMember,
                None,
                Reply::Grant(grant("pending-at", acme_tenants())),
            )
            .on(
                AccountKind::OrganizationMember,
                Some(TenantId::from(2)),
                Reply::Grant(grant("eu-at", vec![])),
            )
            .on(
                AccountKind::OrganizationMember,
                Some(TenantId::from(1)),
                Reply::Reject(403, Some("Tenant suspended")),
            )
    }

    /// Store whose writes fail, as on a full or read-only disk.
    struct ReadOnlyStore(Arc<MemoryStore>);

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, key: StoreKey) -> Result<Option<String>, Error> {
            self.0.get(key)
        }

        fn put(&self, _key: StoreKey, _value: &str) -> Result<(), Error> {
            Err(Error::Io(std::io::Error::other("read-only file system")))
        }

        fn remove(&self, key: StoreKey) -> Result<(), Error> {
            self.0.remove(key)
        }
    }

    fn individual_exchange() -> ScriptedExchange {
        ScriptedExchange::default()
            .on(AccountKind::Individual, None, Reply::Grant(grant("ind-at", vec![])))
    }

    #[tokio::test]
    async fn single_tenant_organization_logs_in_directly() {
        let exchange = ScriptedExchange::default().on(
            AccountKind::OrganizationMember,
            None,
            Reply::Grant(grant("org-at", vec![TenantCandidate::new(1, "Acme US")])),
        );
        let (mut orch, store, mut rx) = orchestrator(exchange);

        let outcome = orch.login(Credentials::new("hr@acme.com", "x")).await.unwrap();

        assert_eq!(
            outcome,
            LoginOutcome::LoggedIn {
                account_kind: AccountKind::OrganizationMember,
                message: ORGANIZATION_LOGIN_MESSAGE.into(),
            }
        );
        assert_eq!(orch.status(), AuthStatus::LoggedIn);
        let session = orch.session().unwrap();
        assert_eq!(session.account_kind, AccountKind::OrganizationMember);
        assert_eq!(session.selected_tenant.as_ref().unwrap().id, TenantId::from(1));
        assert!(store.contains(StoreKey::User));
        assert_eq!(rx.try_recv().unwrap().severity, Severity::Success);
    }

    #[tokio::test]
    async fn multi_tenant_organization_awaits_choice() {
        let (mut orch, store, mut rx) = orchestrator(multi_tenant_exchange());

        let outcome = orch.login(Credentials::new("hr@acme.com", "x")).await.unwrap();

        assert_eq!(
            outcome,
            LoginOutcome::TenantChoiceRequired { candidates: acme_tenants() }
        );
        assert_eq!(orch.status(), AuthStatus::AwaitingTenantChoice);
        assert!(orch.session().is_none());
        assert_eq!(orch.tenant_candidates().unwrap().len(), 2);
        assert!(!store.contains(StoreKey::User));
        assert_eq!(
            store.get(StoreKey::AccessToken).unwrap().as_deref(),
            Some("pending-at")
        );
        assert!(store.contains(StoreKey::PendingTenantCandidates));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn select_employer_finalizes_session() {
        let (mut orch, store, _rx) = orchestrator(multi_tenant_exchange());
        orch.login(Credentials::new("hr@acme.com", "x")).await.unwrap();

        let outcome = orch.select_employer(&TenantId::from(2)).await.unwrap();

        assert!(outcome.is_logged_in());
        let session = orch.session().unwrap();
        assert_eq!(session.selected_tenant.as_ref().unwrap().id, TenantId::from(2));
        assert_eq!(session.selected_tenant.as_ref().unwrap().name.as_deref(), Some("Acme EU"));
        assert_eq!(session.tokens.access_token, "eu-at");
        assert_eq!(store.get(StoreKey::AccessToken).unwrap().as_deref(), Some("eu-at"));
        assert!(!store.contains(StoreKey::PendingTenantCandidates));
        assert_eq!(
            orch.exchange.calls().last(),
            Some(&(AccountKind::OrganizationMember, Some(TenantId::from(2))))
        );
    }

    #[tokio::test]
    async fn rejected_employer_choice_stays_pending() {
        let (mut orch, _store, mut rx) = orchestrator(multi_tenant_exchange());
        orch.login(Credentials::new("hr@acme.com", "x")).await.unwrap();

        let outcome = orch.select_employer(&TenantId::from(1)).await.unwrap();

        assert_eq!(outcome, LoginOutcome::Failed { message: "Tenant suspended".into() });
        assert_eq!(orch.status(), AuthStatus::AwaitingTenantChoice);
        assert_eq!(rx.try_recv().unwrap(), Notice::error("Tenant suspended"));
    }

    #[tokio::test]
    async fn unknown_employer_choice_is_rejected() {
        let (mut orch, _store, _rx) = orchestrator(multi_tenant_exchange());
        orch.login(Credentials::new("hr@acme.com", "x")).await.unwrap();
        let calls_before = orch.exchange.calls().len();

        let err = orch.select_employer(&TenantId::from(99)).await.unwrap_err();

        assert!(matches!(err, Error::InvalidTenantChoice(TenantId::Number(99))));
        assert_eq!(orch.status(), AuthStatus::AwaitingTenantChoice);
        assert_eq!(orch.exchange.calls().len(), calls_before);
    }

    #[tokio::test]
    async fn select_employer_without_pending_choice() {
        let (mut orch, _store, _rx) = orchestrator(ScriptedExchange::default());
        let err = orch.select_employer(&TenantId::from(1)).await.unwrap_err();
        assert!(matches!(err, Error::NoPendingSelection));
    }

    #[tokio::test]
    async fn cancel_selection_clears_store() {
        let (mut orch, store, _rx) = orchestrator(multi_tenant_exchange());
        orch.login(Credentials::new("hr@acme.com", "x")).await.unwrap();

        orch.cancel_selection().unwrap();

        assert_eq!(orch.status(), AuthStatus::LoggedOut);
        assert!(store.is_empty());
        assert!(matches!(orch.cancel_selection(), Err(Error::NoPendingSelection)));
    }

    #[tokio::test]
    async fn individual_fallback() {
        let exchange = ScriptedExchange::default()
            .on(
                AccountKind::OrganizationMember,
                None,
                Reply::Reject(401, Some("Invalid credentials")),
            )
            .on(AccountKind::Individual, None, Reply::Grant(grant("ind-at", vec![])));
        let (mut orch, _store, mut rx) = orchestrator(exchange);

        let outcome = orch.login(Credentials::new("jane@doe.com", "y")).await.unwrap();

        assert_eq!(
            outcome,
            LoginOutcome::LoggedIn {
                account_kind: AccountKind::Individual,
                message: INDIVIDUAL_LOGIN_MESSAGE.into(),
            }
        );
        let session = orch.session().unwrap();
        assert_eq!(session.account_kind, AccountKind::Individual);
        assert!(session.selected_tenant.is_none());
        assert_eq!(rx.try_recv().unwrap(), Notice::success(INDIVIDUAL_LOGIN_MESSAGE));
    }

    #[tokio::test]
    async fn both_endpoints_failing_changes_nothing() {
        let exchange = ScriptedExchange::default()
            .on(
                AccountKind::OrganizationMember,
                None,
                Reply::Reject(401, Some("Invalid credentials")),
            )
            .on(AccountKind::Individual, None, Reply::Reject(404, Some("User not found")));
        let (mut orch, store, mut rx) = orchestrator(exchange);

        let outcome = orch.login(Credentials::new("nobody@x.com", "z")).await.unwrap();

        assert_eq!(outcome, LoginOutcome::Failed { message: "User not found".into() });
        assert_eq!(orch.status(), AuthStatus::LoggedOut);
        assert!(store.is_empty());
        assert_eq!(rx.try_recv().unwrap(), Notice::error("User not found"));
    }

    #[tokio::test]
    async fn failed_relogin_keeps_existing_session() {
        let exchange = ScriptedExchange::default()
            .on(AccountKind::OrganizationMember, None, Reply::Reject(401, None))
            .on(AccountKind::Individual, None, Reply::Reject(401, None));
        let store = Arc::new(MemoryStore::new());
        {
            let vault = SessionVault::new(store.clone());
            vault
                .save_session(&Session::new(
                    AccountKind::Individual,
                    Profile::new(),
                    None,
                    crate::types::TokenPair::new("kept-at", None),
                ))
                .unwrap();
        }
        let (tx, _rx) = unbounded_channel();
        let mut orch = SessionOrchestrator::new(exchange, store.clone(), tx).unwrap();
        assert_eq!(orch.status(), AuthStatus::LoggedIn);

        let outcome = orch.login(Credentials::new("jane@doe.com", "wrong")).await.unwrap();

        assert_eq!(
            outcome.message(),
            Some(crate::exchange::DEFAULT_LOGIN_ERROR)
        );
        assert_eq!(orch.status(), AuthStatus::LoggedIn);
        assert_eq!(orch.session().unwrap().tokens.access_token, "kept-at");
        assert_eq!(store.get(StoreKey::AccessToken).unwrap().as_deref(), Some("kept-at"));
    }

    #[tokio::test]
    async fn session_write_failure_logs_out() {
        let store = Arc::new(ReadOnlyStore(Arc::new(MemoryStore::new())));
        let (tx, mut rx) = unbounded_channel();
        let mut orch = SessionOrchestrator::new(individual_exchange(), store, tx).unwrap();

        let err = orch.login(Credentials::new("jane@doe.com", "y")).await.unwrap_err();

        assert!(matches!(err, Error::Io(_)));
        assert_eq!(orch.status(), AuthStatus::LoggedOut);
        assert!(orch.session().is_none());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn pending_write_failure_logs_out() {
        let store = Arc::new(ReadOnlyStore(Arc::new(MemoryStore::new())));
        let (tx, _rx) = unbounded_channel();
        let mut orch = SessionOrchestrator::new(multi_tenant_exchange(), store, tx).unwrap();

        let err = orch.login(Credentials::new("hr@acme.com", "x")).await.unwrap_err();

        assert!(matches!(err, Error::Io(_)));
        assert_eq!(orch.status(), AuthStatus::LoggedOut);
        assert!(orch.tenant_candidates().is_none());
        assert!(matches!(
            orch.select_employer(&TenantId::from(2)).await,
            Err(Error::NoPendingSelection)
        ));
    }

    #[tokio::test]
    async fn write_failure_on_relogin_clears_restored_session() {
        let seeded = Arc::new(MemoryStore::new());
        SessionVault::new(seeded.clone())
            .save_session(&Session::new(
                AccountKind::Individual,
                Profile::new(),
                None,
                crate::types::TokenPair::new("old-at", None),
            ))
            .unwrap();
        let store = Arc::new(ReadOnlyStore(seeded.clone()));
        let (tx, _rx) = unbounded_channel();
        let mut orch = SessionOrchestrator::new(individual_exchange(), store.clone(), tx).unwrap();
        assert_eq!(orch.status(), AuthStatus::LoggedIn);

        let result = orch.login(Credentials::new("jane@doe.com", "y")).await;

        assert!(result.is_err());
        assert_eq!(orch.status(), AuthStatus::LoggedOut);
        assert!(seeded.is_empty());
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let exchange = ScriptedExchange::default()
            .on(AccountKind::Individual, None, Reply::Grant(grant("ind-at", vec![])));
        let (mut orch, store, _rx) = orchestrator(exchange);

        orch.logout().unwrap();
        assert!(store.is_empty());

        orch.login(Credentials::new("jane@doe.com", "y")).await.unwrap();
        assert!(orch.is_authenticated());

        orch.logout().unwrap();
        orch.logout().unwrap();
        assert_eq!(orch.status(), AuthStatus::LoggedOut);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn logout_during_pending_choice() {
        let (mut orch, store, _rx) = orchestrator(multi_tenant_exchange());
        orch.login(Credentials::new("hr@acme.com", "x")).await.unwrap();

        orch.logout().unwrap();

        assert_eq!(orch.status(), AuthStatus::LoggedOut);
        assert!(store.is_empty());
        assert!(orch.tenant_candidates().is_none());
    }

    #[test]
    fn hydrates_stored_session() {
        let store = Arc::new(MemoryStore::new());
        SessionVault::new(store.clone())
            .save_session(&Session::new(
                AccountKind::OrganizationMember,
                Profile::new(),
                Some(TenantCandidate::new(2, "Acme EU")),
                crate::types::TokenPair::new("at", Some("rt".into())),
            ))
            .unwrap();

        let (tx, _rx) = unbounded_channel();
        let orch = SessionOrchestrator::new(ScriptedExchange::default(), store, tx).unwrap();

        assert_eq!(orch.status(), AuthStatus::LoggedIn);
        assert_eq!(
            orch.session().unwrap().selected_tenant.as_ref().unwrap().id,
            TenantId::from(2)
        );
    }

    #[test]
    fn malformed_stored_session_starts_logged_out() {
        let store = Arc::new(
            MemoryStore::new()
                .with_entry(StoreKey::User, "[]")
                .with_entry(StoreKey::AccessToken, "at"),
        );
        let (tx, _rx) = unbounded_channel();
        let orch = SessionOrchestrator::new(ScriptedExchange::default(), store.clone(), tx).unwrap();

        assert_eq!(orch.status(), AuthStatus::LoggedOut);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn update_profile_persists() {
        let exchange = ScriptedExchange::default()
            .on(AccountKind::Individual, None, Reply::Grant(grant("ind-at", vec![])));
        let (mut orch, store, _rx) = orchestrator(exchange);

        let mut fresh = Profile::new();
        fresh.insert("name".into(), json!("Jane Doe"));
        assert!(matches!(
            orch.update_profile(fresh.clone()),
            Err(Error::NotAuthenticated)
        ));

        orch.login(Credentials::new("jane@doe.com", "y")).await.unwrap();
        orch.update_profile(fresh).unwrap();

        assert_eq!(orch.session().unwrap().name(), Some("Jane Doe"));
        let raw = store.get(StoreKey::User).unwrap().unwrap();
        assert!(raw.contains("Jane Doe"));
    }

    #[tokio::test]
    async fn post_login_route_resumes_job_application() {
        let exchange = ScriptedExchange::default()
            .on(AccountKind::Individual, None, Reply::Grant(grant("ind-at", vec![])));
        let (mut orch, _store, _rx) = orchestrator(exchange);

        orch.remember_return_to_job(&JobId::from("42".to_string())).unwrap();
        assert_eq!(orch.post_login_route().unwrap(), None);

        orch.login(Credentials::new("jane@doe.com", "y")).await.unwrap();
        assert_eq!(
            orch.post_login_route().unwrap().as_deref(),
            Some("/find-job/42?apply=true")
        );
        assert_eq!(
            orch.post_login_route().unwrap().as_deref(),
            Some(navigation::DASHBOARD_ROUTE)
        );
    }
}
