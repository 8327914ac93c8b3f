//! Error types for the session layer.

use pulse_protocol::UserId;

/// Errors that can occur during session management.
///
/// These cover talking to the auth backend and persisting credentials.
/// Note that [`SessionManager::init_session`](crate::SessionManager::init_session)
/// never returns any of these: boot-time failures degrade to the
/// unauthenticated state instead.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The backend rejected the submitted credentials (wrong password,
    /// unknown email, validation error). Retryable immediately.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// Registration was accepted but the account waits for manual
    /// approval (e.g. a coach whose evidence must be reviewed).
    ///
    /// This is not a failure from the user's point of view. Backends
    /// return it as an error; [`SessionManager::register`](crate::SessionManager::register)
    /// turns it into [`RegistrationOutcome::PendingApproval`](crate::RegistrationOutcome::PendingApproval).
    #[error("registration pending approval: {0}")]
    PendingApproval(String),

    /// A stored token was presented and the backend no longer accepts it
    /// (expired, revoked, malformed).
    #[error("token rejected: {0}")]
    TokenRejected(String),

    /// The backend could not be reached or answered with a server error.
    #[error("auth backend unavailable: {0}")]
    Backend(String),

    /// Reading or writing the persisted credential failed.
    #[error("credential storage failed: {0}")]
    Storage(#[from] std::io::Error),

    /// The persisted credential exists but cannot be parsed.
    #[error("stored credential is corrupt: {0}")]
    CorruptCredentials(#[source] serde_json::Error),

    /// The operation needs an authenticated session.
    #[error("not authenticated")]
    NotAuthenticated,

    /// A profile update named a different user than the session's.
    #[error("identity {actual} does not match session user {expected}")]
    IdentityMismatch { expected: UserId, actual: UserId },
}

impl SessionError {
    /// Returns `true` for the "accepted, awaiting approval" outcome.
    pub fn is_pending_approval(&self) -> bool {
        matches!(self, SessionError::PendingApproval(_))
    }

    /// Returns `true` when the error means the credential itself is bad,
    /// as opposed to the backend being unreachable.
    pub fn is_credential_rejection(&self) -> bool {
        matches!(
            self,
            SessionError::TokenRejected(_) | SessionError::AuthFailed(_)
        )
    }
}
