//! Authenticated-session management for Pulse.
//!
//! This crate owns the client's identity lifecycle:
//!
//! 1. **Credentials**: persisting the auth token across restarts
//!    ([`CredentialStore`], [`FileCredentialStore`])
//! 2. **Authentication**: talking to the auth backend ([`AuthBackend`] trait)
//! 3. **Session state**: login, register, logout, restore-on-boot, and the
//!    reactive `is_authenticated` / `is_initialized` flags
//!    ([`SessionManager`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Client (above)     ← wires session state to the realtime channel
//!     ↕
//! Session (this crate)  ← who the user is, and whether we know yet
//!     ↕
//! Protocol (below)   ← provides UserId
//! ```

mod auth;
mod error;
mod identity;
mod manager;
mod store;

pub use auth::AuthBackend;
pub use error::SessionError;
pub use identity::{AuthGrant, Identity, Registration, Role, Verification};
pub use manager::{RegistrationOutcome, SessionManager, SessionSnapshot};
pub use store::{
    CredentialStore, FileCredentialStore, MemoryCredentialStore, Token,
};
