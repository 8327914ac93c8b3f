//! The auth backend collaborator.
//!
//! Pulse doesn't implement authentication itself; the platform's HTTP API
//! does. [`AuthBackend`] is the seam: three async methods the session
//! manager calls, implemented by whatever talks to that API (or by a fake
//! in tests).

use std::future::Future;

use crate::{AuthGrant, Identity, Registration, SessionError, Token};

/// Talks to the platform's auth and identity endpoints.
///
/// # Trait bounds
///
/// - `Send + Sync` → the backend is shared with whichever task calls the
///   session manager.
/// - `'static` → it lives as long as the application.
///
/// # Example
///
/// ```rust
/// use pulse_protocol::UserId;
/// use pulse_session::{
///     AuthBackend, AuthGrant, Identity, Registration, Role, SessionError,
///     Token, Verification,
/// };
///
/// /// Accepts any password and derives the user id from the email.
/// /// Only for local development!
/// struct DevBackend;
///
/// fn identity_for(email: &str) -> Identity {
///     Identity {
///         user_id: UserId::new(email),
///         email: email.to_string(),
///         display_name: email.to_string(),
///         role: Role::Member,
///         verification: Verification::Unverified,
///         avatar_url: None,
///     }
/// }
///
/// impl AuthBackend for DevBackend {
///     async fn login(
///         &self,
///         email: &str,
///         _password: &str,
///     ) -> Result<AuthGrant, SessionError> {
///         Ok(AuthGrant {
///             token: Token::new(format!("dev:{email}")),
///             identity: identity_for(email),
///         })
///     }
///
///     async fn register(
///         &self,
///         registration: &Registration,
///     ) -> Result<AuthGrant, SessionError> {
///         self.login(&registration.email, &registration.password).await
///     }
///
///     async fn restore(&self, token: &Token) -> Result<Identity, SessionError> {
///         let email = token
///             .expose()
///             .strip_prefix("dev:")
///             .ok_or_else(|| SessionError::TokenRejected("not a dev token".into()))?;
///         Ok(identity_for(email))
///     }
/// }
/// ```
pub trait AuthBackend: Send + Sync + 'static {
    /// Exchanges email and password for a token and identity.
    ///
    /// # Errors
    /// - `SessionError::AuthFailed`: bad credentials
    /// - `SessionError::Backend`: the API is unreachable
    fn login(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthGrant, SessionError>> + Send;

    /// Creates an account.
    ///
    /// # Errors
    /// - `SessionError::PendingApproval`: accepted, but the account must
    ///   be approved before it can sign in (no token is issued)
    /// - `SessionError::AuthFailed`: rejected (email taken, invalid data)
    /// - `SessionError::Backend`: the API is unreachable
    fn register(
        &self,
        registration: &Registration,
    ) -> impl Future<Output = Result<AuthGrant, SessionError>> + Send;

    /// Resolves a stored token back into the identity it was issued for.
    ///
    /// # Errors
    /// - `SessionError::TokenRejected`: expired, revoked, or malformed
    /// - `SessionError::Backend`: the API is unreachable
    fn restore(
        &self,
        token: &Token,
    ) -> impl Future<Output = Result<Identity, SessionError>> + Send;
}
