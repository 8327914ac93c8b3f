//! Who the user is: identity, role, and the payloads exchanged with the
//! auth backend.

use std::fmt;

use pulse_protocol::UserId;
use serde::{Deserialize, Serialize};

use crate::Token;

/// The platform role a user signed up with.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular member. Active as soon as registration succeeds.
    #[default]
    Member,

    /// Coach. Must upload evidence and is approved manually.
    Coach,

    /// Platform staff.
    Admin,
}

impl Role {
    /// Whether registering with this role needs manual approval.
    pub fn requires_verification(self) -> bool {
        matches!(self, Role::Coach)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Member => "member",
            Role::Coach => "coach",
            Role::Admin => "admin",
        };
        f.write_str(name)
    }
}

/// Review state of a user's verification evidence.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Verification {
    #[default]
    Unverified,
    Pending,
    Verified,
    Rejected,
}

/// The authenticated user's identity and profile fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Server-issued user id. Presented in the realtime handshake.
    pub user_id: UserId,

    pub email: String,

    pub display_name: String,

    #[serde(default)]
    pub role: Role,

    #[serde(default)]
    pub verification: Verification,

    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// What the backend hands out on a successful login or registration.
#[derive(Debug, Clone)]
pub struct AuthGrant {
    pub token: Token,
    pub identity: Identity,
}

/// Sign-up payload forwarded to the auth backend.
#[derive(Clone, Serialize, Deserialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub role: Role,
    /// References to uploaded verification documents, required for
    /// roles where [`Role::requires_verification`] is true.
    #[serde(default)]
    pub evidence: Vec<String>,
}

// Hand-written so the password never reaches a log line.
impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("display_name", &self.display_name)
            .field("role", &self.role)
            .field("evidence", &self.evidence)
            .finish()
    }
}
