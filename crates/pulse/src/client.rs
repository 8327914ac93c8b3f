//! The application root: one session manager plus one realtime client.
//!
//! [`Client`] is the explicit context object the rest of an application
//! holds on to. It wires the two managers together where their lifecycles
//! meet: restoring a session opens the channel, and logging out closes it.

use std::path::PathBuf;
use std::sync::Arc;

use pulse_protocol::JsonCodec;
use pulse_realtime::{
    ConnectionStatus, ConnectionView, RealtimeClient, RealtimeConfig,
};
use pulse_session::{
    AuthBackend, CredentialStore, FileCredentialStore, Identity,
    MemoryCredentialStore, Registration, RegistrationOutcome, SessionManager,
    SessionSnapshot,
};
use pulse_transport::{Connector, WebSocketConnector};

use crate::{ClientConfig, PulseError};

/// The credential store both managers share.
pub type SharedCredentials = Arc<dyn CredentialStore>;

/// Session and realtime connection, managed together.
///
/// # Example
///
/// ```rust,ignore
/// let client = ClientBuilder::new()
///     .server_url("wss://rt.example.com/ws")
///     .credentials_path("/home/me/.config/pulse/credentials.json")
///     .build(MyBackend::new());
///
/// // Restores the session and, if signed in, opens the channel.
/// client.init().await?;
/// ```
pub struct Client<A: AuthBackend> {
    session: SessionManager<A, SharedCredentials>,
    realtime: RealtimeClient,
}

impl<A: AuthBackend> Client<A> {
    /// Wires a client from its parts. Must be called inside a Tokio
    /// runtime (the realtime actor is spawned here).
    pub fn new<C: Connector>(
        backend: A,
        connector: C,
        credentials: SharedCredentials,
        config: RealtimeConfig,
    ) -> Self {
        let realtime = RealtimeClient::spawn(
            connector,
            JsonCodec,
            Arc::clone(&credentials),
            config,
        );
        Self {
            session: SessionManager::new(backend, credentials),
            realtime,
        }
    }

    pub fn session(&self) -> &SessionManager<A, SharedCredentials> {
        &self.session
    }

    pub fn realtime(&self) -> &RealtimeClient {
        &self.realtime
    }

    /// Restores the session from the stored credential and, when that
    /// yields an identity, opens the realtime channel for it.
    ///
    /// # Errors
    /// Only if the realtime actor is gone; restore failures degrade to an
    /// unauthenticated snapshot.
    pub async fn init(&self) -> Result<SessionSnapshot, PulseError> {
        let snapshot = self.session.init_session().await;
        if let Some(user_id) = snapshot.user_id() {
            self.realtime.connect(user_id.clone()).await?;
        }
        Ok(snapshot)
    }

    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, PulseError> {
        Ok(self.session.login(email, password).await?)
    }

    pub async fn register(
        &self,
        registration: &Registration,
    ) -> Result<RegistrationOutcome, PulseError> {
        Ok(self.session.register(registration).await?)
    }

    /// Ends the session and closes the channel.
    pub async fn logout(&self) -> Result<(), PulseError> {
        self.session.logout();
        self.realtime.disconnect().await?;
        Ok(())
    }

    /// Opens the channel for the signed-in user.
    ///
    /// # Errors
    /// `PulseError::NotAuthenticated` when nobody is signed in.
    pub async fn connect(&self) -> Result<ConnectionStatus, PulseError> {
        let snapshot = self.session.snapshot();
        let user_id = snapshot
            .user_id()
            .filter(|_| snapshot.is_authenticated())
            .ok_or(PulseError::NotAuthenticated)?;
        Ok(self.realtime.connect(user_id.clone()).await?)
    }

    pub async fn disconnect(&self) -> Result<(), PulseError> {
        Ok(self.realtime.disconnect().await?)
    }

    pub fn connection(&self) -> ConnectionView {
        self.realtime.view()
    }

    /// Closes the channel and stops the realtime actor. The session (and
    /// its stored credential) is left alone.
    pub async fn dispose(&self) -> Result<(), PulseError> {
        tracing::debug!("disposing client");
        Ok(self.realtime.shutdown().await?)
    }
}

// ---------------------------------------------------------------------------
// ClientBuilder
// ---------------------------------------------------------------------------

/// Builder for a [`Client`].
#[derive(Default)]
pub struct ClientBuilder {
    config: ClientConfig,
    credentials: Option<SharedCredentials>,
}

impl ClientBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing configuration (e.g.
    /// [`ClientConfig::from_env`]).
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.config.server_url = url.into();
        self
    }

    /// Persists the credential to this file.
    pub fn credentials_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.credentials_path = Some(path.into());
        self
    }

    /// Uses this store instead of one derived from the configuration.
    pub fn credential_store(mut self, store: SharedCredentials) -> Self {
        self.credentials = Some(store);
        self
    }

    pub fn realtime(mut self, config: RealtimeConfig) -> Self {
        self.config.realtime = config;
        self
    }

    /// Builds a client that dials `server_url` over WebSocket.
    pub fn build<A: AuthBackend>(self, backend: A) -> Client<A> {
        let connector = WebSocketConnector::new(self.config.server_url.clone());
        self.build_with(backend, connector)
    }

    /// Builds a client on a custom connector.
    pub fn build_with<A: AuthBackend, C: Connector>(
        self,
        backend: A,
        connector: C,
    ) -> Client<A> {
        let credentials: SharedCredentials = match self.credentials {
            Some(store) => store,
            None => match &self.config.credentials_path {
                Some(path) => Arc::new(FileCredentialStore::new(path)),
                None => Arc::new(MemoryCredentialStore::new()),
            },
        };
        Client::new(backend, connector, credentials, self.config.realtime)
    }
}
