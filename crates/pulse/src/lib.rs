//! # Pulse
//!
//! Client-side session and realtime connection management.
//!
//! Pulse keeps two things for an application: who the user is (a session
//! restored from a stored credential, or created by login/registration),
//! and a live channel to the realtime server that reports who else is
//! online and remembers which rooms the client asked to join.
//!
//! ## Crates
//!
//! - `pulse-protocol`: wire frames and codecs
//! - `pulse-transport`: `Connector`/`Link` traits, WebSocket and in-memory
//!   transports
//! - `pulse-session`: credential store and session manager
//! - `pulse-realtime`: connection state machine, presence, rooms
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pulse::prelude::*;
//!
//! # async fn run(backend: impl AuthBackend) -> Result<(), PulseError> {
//! pulse::logging::init();
//!
//! let client = ClientBuilder::new()
//!     .config(ClientConfig::from_env()?)
//!     .build(backend);
//!
//! let session = client.init().await?;
//! if !session.is_authenticated() {
//!     client.login("a@b.com", "pw").await?;
//!     client.connect().await?;
//! }
//!
//! let view = client
//!     .realtime()
//!     .wait_for(|v| v.status == ConnectionStatus::Open)
//!     .await?;
//! println!("online: {:?}", view.online_users);
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
pub mod logging;

pub use client::{Client, ClientBuilder, SharedCredentials};
pub use config::{
    ClientConfig, ENV_CONNECT_TIMEOUT_SECS, ENV_CREDENTIALS_PATH,
    ENV_SERVER_URL,
};
pub use error::PulseError;

pub use pulse_protocol as protocol;
pub use pulse_realtime as realtime;
pub use pulse_session as session;
pub use pulse_transport as transport;

pub mod prelude {
    pub use crate::{Client, ClientBuilder, ClientConfig, PulseError};
    pub use pulse_protocol::{RoomId, UserId};
    pub use pulse_realtime::{
        ConnectionStatus, ConnectionView, Delivery, RealtimeClient,
        RealtimeConfig,
    };
    pub use pulse_session::{
        AuthBackend, AuthGrant, CredentialStore, Identity, Registration,
        RegistrationOutcome, Role, SessionError, SessionSnapshot, Token,
        Verification,
    };
}
