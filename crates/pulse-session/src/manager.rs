//! The session manager: the client's authenticated-identity lifecycle.
//!
//! It's responsible for:
//! - Restoring the session from the stored token on boot
//! - Logging in and registering through the [`AuthBackend`]
//! - Logging out and invalidating rejected credentials
//! - Publishing `is_authenticated` / `is_initialized` to observers
//!
//! # Concurrency note
//!
//! Every method takes `&self`, so the manager can sit in an `Arc` and be
//! called from several tasks. Overlapping writes follow "last writer wins":
//! two concurrent logins both succeed and the one that commits last owns
//! the session. The credential write and the state publish happen inside
//! one short commit section, so an observer never sees the token of one
//! login paired with the identity of another.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use pulse_protocol::UserId;
use tokio::sync::watch;

use crate::{
    AuthBackend, AuthGrant, CredentialStore, Identity, Registration,
    SessionError, Token,
};

// ---------------------------------------------------------------------------
// SessionSnapshot
// ---------------------------------------------------------------------------

/// What the UI observes about the session.
///
/// ```text
///            init_session()                login()/register()
/// [uninit] ─────────────────→ [init, anon] ──────────────────→ [init, auth]
///     │                            ↑                                 │
///     └──(stored token valid)──────┼────────→ [init, auth]           │
///                                  └──────── logout()/invalidate() ──┘
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    identity: Option<Identity>,
    authenticated: bool,
    initialized: bool,
}

impl SessionSnapshot {
    /// The signed-in user's identity.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Shorthand for the signed-in user's id.
    pub fn user_id(&self) -> Option<&UserId> {
        self.identity.as_ref().map(|identity| &identity.user_id)
    }

    /// `true` iff an identity and a token are both held and nothing has
    /// invalidated them.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated && self.identity.is_some()
    }

    /// `true` once the boot-time restore attempt has finished, whatever
    /// its outcome. Routing decisions must wait for this.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

/// Result of a registration the backend accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// The account is live and the session is now authenticated.
    Active(Identity),

    /// The account waits for manual approval. The session is unchanged.
    PendingApproval { message: String },
}

// ---------------------------------------------------------------------------
// SessionManager
// ---------------------------------------------------------------------------

/// Owns the authenticated identity and its persisted credential.
pub struct SessionManager<A, S> {
    backend: A,
    store: S,

    /// Reactive state. `send_modify` publishes even with no receivers.
    state: watch::Sender<SessionSnapshot>,

    /// Flipped by the first `init_session` call; later calls are no-ops.
    init_started: AtomicBool,

    /// Serializes "write credential + publish state" pairs. Never held
    /// across an `.await`.
    commit: Mutex<()>,
}

impl<A: AuthBackend, S: CredentialStore> SessionManager<A, S> {
    /// Creates an uninitialized, unauthenticated manager.
    pub fn new(backend: A, store: S) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::default());
        Self {
            backend,
            store,
            state,
            init_started: AtomicBool::new(false),
            commit: Mutex::new(()),
        }
    }

    /// Returns a receiver that is notified on every session change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// Returns the current session state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn is_initialized(&self) -> bool {
        self.state.borrow().is_initialized()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.state.borrow().identity.clone()
    }

    /// The credential store this manager writes to.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Restores the session from the stored token.
    ///
    /// Never fails: a missing, rejected, or unreadable credential leaves
    /// the session unauthenticated. A rejected token is also cleared; a
    /// backend outage keeps it so the next start can try again.
    ///
    /// `is_initialized` flips to `true` exactly once, in the same publish
    /// as the restored identity, so no observer sees "initialized" before
    /// the restore outcome is known. Calls after the first return the
    /// current state without touching the backend.
    pub async fn init_session(&self) -> SessionSnapshot {
        if self.init_started.swap(true, Ordering::SeqCst) {
            tracing::debug!("session restore already ran");
            return self.snapshot();
        }

        let restored = self.restore_from_store().await;

        let guard = self.lock_commit();
        // A login or logout that committed during the restore owns the
        // session; the restored identity only applies to the token it
        // was validated against.
        let restored = restored.filter(|(token, _)| {
            let current = matches!(self.store.load(), Ok(Some(ref t)) if t == token);
            if !current {
                tracing::debug!("credential changed during restore, discarding");
            }
            current
        });
        self.state.send_modify(|s| {
            if let Some((_, identity)) = restored {
                s.identity = Some(identity);
                s.authenticated = true;
            }
            s.initialized = true;
        });
        drop(guard);

        let snapshot = self.snapshot();
        tracing::info!(
            authenticated = snapshot.is_authenticated(),
            "session initialized"
        );
        snapshot
    }

    /// Signs in with email and password.
    ///
    /// # Errors
    /// Whatever the backend returns (typically
    /// [`SessionError::AuthFailed`]), or a storage error if the token
    /// can't be persisted. On error the previous session is untouched.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, SessionError> {
        let grant = self.backend.login(email, password).await.inspect_err(
            |e| tracing::info!(error = %e, "login rejected"),
        )?;
        self.establish(grant)
    }

    /// Creates an account and, when it is immediately active, signs in.
    ///
    /// A registration awaiting manual approval comes back as
    /// `Ok(RegistrationOutcome::PendingApproval)` and leaves the session
    /// exactly as it was.
    ///
    /// # Errors
    /// Any other backend or storage error.
    pub async fn register(
        &self,
        registration: &Registration,
    ) -> Result<RegistrationOutcome, SessionError> {
        match self.backend.register(registration).await {
            Ok(grant) => Ok(RegistrationOutcome::Active(self.establish(grant)?)),
            Err(SessionError::PendingApproval(message)) => {
                tracing::info!(
                    role = %registration.role,
                    "registration accepted, pending approval"
                );
                Ok(RegistrationOutcome::PendingApproval { message })
            }
            Err(e) => {
                tracing::info!(error = %e, "registration rejected");
                Err(e)
            }
        }
    }

    /// Signs out: clears the stored token, the identity, and the
    /// authenticated flag.
    ///
    /// The realtime channel is not this manager's to close; the
    /// application root does that right after (see `pulse::Client`).
    pub fn logout(&self) {
        self.end_session("logged out");
    }

    /// Destroys the session after an unrecoverable auth failure (e.g. the
    /// server rejected the token mid-session).
    pub fn invalidate(&self) {
        self.end_session("session invalidated");
    }

    /// Re-validates the stored token and refreshes the identity from it.
    ///
    /// # Errors
    /// - [`SessionError::NotAuthenticated`]: no stored token
    /// - [`SessionError::TokenRejected`]: the session is destroyed as well
    /// - any backend/storage error, leaving the session as it was
    pub async fn refresh(&self) -> Result<Identity, SessionError> {
        let token = self.store.load()?.ok_or(SessionError::NotAuthenticated)?;

        match self.backend.restore(&token).await {
            Ok(identity) => {
                let _guard = self.lock_commit();
                // A login may have replaced the token while we waited.
                if self.store.load()?.as_ref() == Some(&token) {
                    self.state.send_modify(|s| {
                        s.identity = Some(identity.clone());
                        s.authenticated = true;
                    });
                }
                Ok(identity)
            }
            Err(e) if e.is_credential_rejection() => {
                tracing::warn!(error = %e, "stored credential rejected on refresh");
                self.discard_if_current(&token);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Replaces the profile fields of the signed-in user (after onboarding,
    /// verification, avatar upload, ...).
    ///
    /// # Errors
    /// - [`SessionError::NotAuthenticated`]: nobody is signed in
    /// - [`SessionError::IdentityMismatch`]: `identity` is another user
    pub fn update_identity(
        &self,
        identity: Identity,
    ) -> Result<(), SessionError> {
        let _guard = self.lock_commit();
        let current = self.snapshot();
        let expected = current
            .user_id()
            .filter(|_| current.is_authenticated())
            .ok_or(SessionError::NotAuthenticated)?;
        if *expected != identity.user_id {
            return Err(SessionError::IdentityMismatch {
                expected: expected.clone(),
                actual: identity.user_id,
            });
        }

        self.state.send_modify(|s| s.identity = Some(identity));
        Ok(())
    }

    // -- internals --------------------------------------------------------

    /// Commits a successful login/registration.
    fn establish(&self, grant: AuthGrant) -> Result<Identity, SessionError> {
        let _guard = self.lock_commit();
        self.store.save(&grant.token)?;

        let identity = grant.identity;
        self.state.send_modify(|s| {
            s.identity = Some(identity.clone());
            s.authenticated = true;
        });
        tracing::info!(user_id = %identity.user_id, "session established");
        Ok(identity)
    }

    /// Loads and validates the stored token. `None` means "start signed out".
    async fn restore_from_store(&self) -> Option<(Token, Identity)> {
        let token = match self.store.load() {
            Ok(Some(token)) => token,
            Ok(None) => {
                tracing::info!("no stored credential");
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not read stored credential");
                return None;
            }
        };

        match self.backend.restore(&token).await {
            Ok(identity) => {
                tracing::info!(user_id = %identity.user_id, "session restored");
                Some((token, identity))
            }
            Err(e) if e.is_credential_rejection() => {
                tracing::info!(error = %e, "stored credential rejected, clearing");
                self.discard_if_current(&token);
                None
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "session restore failed, keeping credential"
                );
                None
            }
        }
    }

    /// Clears the session, but only if `token` is still the stored one.
    /// A login that committed in the meantime wins.
    fn discard_if_current(&self, token: &Token) {
        let _guard = self.lock_commit();
        match self.store.load() {
            Ok(Some(current)) if current == *token => {}
            Ok(_) => {
                tracing::debug!("credential replaced meanwhile, not clearing");
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not re-read credential");
            }
        }
        self.clear_locked("credential rejected");
    }

    fn end_session(&self, why: &'static str) {
        let _guard = self.lock_commit();
        self.clear_locked(why);
    }

    /// Clears token and identity. Caller holds the commit lock.
    fn clear_locked(&self, why: &'static str) {
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "failed to clear stored credential");
        }
        self.state.send_modify(|s| {
            s.identity = None;
            s.authenticated = false;
        });
        tracing::info!(reason = why, "session ended");
    }

    fn lock_commit(&self) -> MutexGuard<'_, ()> {
        self.commit.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =========================================================================
// Tests
// =========================================================================
