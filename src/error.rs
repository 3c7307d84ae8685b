use crate::types::{AccountKind, TenantId};

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Network failure before a response was received.
    #[cfg(feature = "client")]
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The login endpoint answered with a non-success status.
    #[error(
        "{kind} login rejected ({status}): {}",
        .message.as_deref().unwrap_or("no message")
    )]
    Rejected {
        kind: AccountKind,
        status: u16,
        message: Option<String>,
    },

    /// The endpoint accepted the login but its payload could not be decoded.
    ///
    /// Ends the fallback: the account belongs to this endpoint's kind.
    #[error("{kind} login returned an unreadable payload: {detail}")]
    UnexpectedResponse { kind: AccountKind, detail: String },

    #[error("malformed stored session: {0}")]
    MalformedStoredSession(String),

    #[error("tenant {0} is not among the pending candidates")]
    InvalidTenantChoice(TenantId),

    #[error("no employer selection is pending")]
    NoPendingSelection,

    #[error("not authenticated")]
    NotAuthenticated,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Human-readable message suitable for a login form, if the failure carries one.
    ///
    /// Empty server messages count as absent.
    #[must_use]
    pub fn user_message(&self) -> Option<String> {
        match self {
            #[cfg(feature = "client")]
            Self::Transport(e) => Some(e.to_string()),
            Self::Rejected { message, .. } => message.clone().filter(|m| !m.is_empty()),
            _ => None,
        }
    }

    /// Whether a failed exchange must stop the fallback to the next account kind.
    #[must_use]
    pub fn ends_fallback(&self) -> bool {
        matches!(self, Self::UnexpectedResponse { .. })
    }
}
