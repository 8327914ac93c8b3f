//! Signs in against a development backend, opens the realtime channel, and
//! logs every status and presence change until Ctrl-C.
//!
//! ```text
//! PULSE_SERVER_URL=ws://127.0.0.1:8080 cargo run -p presence-watch -- me@example.com
//! ```

use pulse::prelude::*;

// ---------------------------------------------------------------------------
// Development backend
// ---------------------------------------------------------------------------

/// Accepts any password. Tokens are `dev:<email>` and the user id is the
/// email itself. Never use outside local development.
struct DevBackend;

fn identity_for(email: &str) -> Identity {
    Identity {
        user_id: UserId::new(email),
        email: email.to_string(),
        display_name: email.split('@').next().unwrap_or(email).to_string(),
        role: Role::Member,
        verification: Verification::Unverified,
        avatar_url: None,
    }
}

impl AuthBackend for DevBackend {
    async fn login(
        &self,
        email: &str,
        _password: &str,
    ) -> Result<AuthGrant, SessionError> {
        Ok(AuthGrant {
            token: Token::new(format!("dev:{email}")),
            identity: identity_for(email),
        })
    }

    async fn register(
        &self,
        registration: &Registration,
    ) -> Result<AuthGrant, SessionError> {
        self.login(&registration.email, &registration.password).await
    }

    async fn restore(&self, token: &Token) -> Result<Identity, SessionError> {
        token
            .expose()
            .strip_prefix("dev:")
            .map(identity_for)
            .ok_or_else(|| SessionError::TokenRejected("not a dev token".into()))
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pulse::logging::init();

    let email = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "dev@example.com".to_string());

    let config = ClientConfig::from_env()?;
    tracing::info!(server = %config.server_url, "starting presence watch");
    let client = ClientBuilder::new().config(config).build(DevBackend);

    let session = client.init().await?;
    if !session.is_authenticated() {
        client.login(&email, "dev").await?;
        client.connect().await?;
    }

    let mut views = client.realtime().subscribe();
    let mut last = views.borrow_and_update().clone();
    tracing::info!(status = %last.status, "watching");

    loop {
        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                if view.status != last.status {
                    tracing::info!(
                        from = %last.status,
                        to = %view.status,
                        error = ?view.last_error,
                        "status changed"
                    );
                }
                if view.online_users != last.online_users {
                    let online: Vec<&str> =
                        view.online_users.iter().map(UserId::as_str).collect();
                    tracing::info!(?online, "presence changed");
                }
                last = view;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break;
            }
        }
    }

    client.dispose().await?;
    Ok(())
}
