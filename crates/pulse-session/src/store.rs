//! Credential Store: the one slot that survives restarts.
//!
//! The store holds the current auth token and nothing else. The session
//! manager reads and writes it; the realtime layer only reads it to attach
//! the token to its handshake.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::SessionError;

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// An opaque auth credential.
///
/// `Debug` is redacted and there is no `Display`, so a token can't end up
/// in a log line by accident. Call [`Token::expose`] where the raw value is
/// actually needed (the wire).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the raw credential string.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(<redacted>)")
    }
}

// ---------------------------------------------------------------------------
// CredentialStore
// ---------------------------------------------------------------------------

/// A key-value slot holding the current token.
///
/// Methods are synchronous: implementations touch a small local file or
/// memory, never the network.
pub trait CredentialStore: Send + Sync + 'static {
    /// Returns the persisted token, if any.
    fn load(&self) -> Result<Option<Token>, SessionError>;

    /// Replaces the persisted token.
    fn save(&self, token: &Token) -> Result<(), SessionError>;

    /// Removes the persisted token. Clearing an empty store is not an
    /// error.
    fn clear(&self) -> Result<(), SessionError>;
}

/// Lets one store be shared (`Arc<dyn CredentialStore>`) between the
/// session manager and the realtime client.
impl<S: CredentialStore + ?Sized> CredentialStore for Arc<S> {
    fn load(&self) -> Result<Option<Token>, SessionError> {
        (**self).load()
    }

    fn save(&self, token: &Token) -> Result<(), SessionError> {
        (**self).save(token)
    }

    fn clear(&self) -> Result<(), SessionError> {
        (**self).clear()
    }
}

// ---------------------------------------------------------------------------
// FileCredentialStore
// ---------------------------------------------------------------------------

/// On-disk layout of the credential file.
#[derive(Serialize, Deserialize)]
struct StoredCredential {
    token: Token,
}

/// File-based store, e.g. `~/.config/pulse/credentials.json`.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<Token>, SessionError> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(None);
            }
            Err(e) => return Err(SessionError::Storage(e)),
        };
        let stored: StoredCredential = serde_json::from_str(&data)
            .map_err(SessionError::CorruptCredentials)?;
        Ok(Some(stored.token))
    }

    fn save(&self, token: &Token) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let data = serde_json::to_string_pretty(&StoredCredential {
            token: token.clone(),
        })
        .map_err(SessionError::CorruptCredentials)?;

        // Owner-only: the file holds a bearer credential. `mode` only
        // applies on create, so an older file is tightened before writing.
        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
            options.mode(0o600);
            if self.path.exists() {
                std::fs::set_permissions(
                    &self.path,
                    std::fs::Permissions::from_mode(0o600),
                )?;
            }
        }
        let mut file = options.open(&self.path)?;
        file.write_all(data.as_bytes())?;

        tracing::debug!(path = %self.path.display(), "credential saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "credential cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionError::Storage(e)),
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryCredentialStore
// ---------------------------------------------------------------------------

/// Process-local store. Nothing survives a restart; used in tests and for
/// ephemeral clients.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<Token>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `token`, as if persisted by an earlier run.
    pub fn with_token(token: Token) -> Self {
        Self {
            slot: Mutex::new(Some(token)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<Token>, SessionError> {
        Ok(self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, token: &Token) -> Result<(), SessionError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(token.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take();
        Ok(())
    }
}
