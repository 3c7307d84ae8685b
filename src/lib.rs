#![doc = include_str!("../README.md")]

#[cfg(feature = "client")]
pub mod client;
#[cfg(feature = "client")]
pub mod config;
pub mod error;
pub mod exchange;
pub mod navigation;
pub mod notify;
pub mod orchestrator;
pub mod store;
pub mod types;
pub mod vault;

// Re-exports for convenient access
#[cfg(feature = "client")]
pub use client::{ExchangeClient, ExchangeConfig};
#[cfg(feature = "client")]
pub use config::{PortalConfig, PortalSession};
pub use error::Error;
pub use exchange::{
    CredentialExchange, DEFAULT_LOGIN_ERROR, ExchangeOutcome, FallbackPolicy, Grant,
    MessagePrecedence,
};
pub use navigation::{DASHBOARD_ROUTE, LOGIN_ROUTE};
pub use notify::{Notice, Notifier, Severity, TracingNotifier};
pub use orchestrator::{AuthStatus, LoginOutcome, SessionOrchestrator};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreKey};
pub use types::{
    AccountKind, Credentials, JobId, Profile, Session, TenantCandidate, TenantId, TokenPair,
};
pub use vault::SessionVault;
