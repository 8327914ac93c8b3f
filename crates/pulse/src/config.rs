//! Client configuration.
//!
//! Values come from [`ClientConfig::default`], optionally overridden by
//! environment variables through [`ClientConfig::from_env`], and finally by
//! whatever the application sets on the [`ClientBuilder`](crate::ClientBuilder).

use std::path::PathBuf;
use std::time::Duration;

use pulse_realtime::RealtimeConfig;

use crate::PulseError;

/// Realtime server endpoint.
pub const ENV_SERVER_URL: &str = "PULSE_SERVER_URL";
/// Where the credential file lives. Unset means credentials are kept in
/// memory only.
pub const ENV_CREDENTIALS_PATH: &str = "PULSE_CREDENTIALS_PATH";
/// Handshake timeout in whole seconds.
pub const ENV_CONNECT_TIMEOUT_SECS: &str = "PULSE_CONNECT_TIMEOUT_SECS";

/// Everything needed to build a [`Client`](crate::Client).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket URL of the realtime server.
    pub server_url: String,
    /// Credential file. `None` keeps the token in memory.
    pub credentials_path: Option<PathBuf>,
    pub realtime: RealtimeConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:8080".to_string(),
            credentials_path: None,
            realtime: RealtimeConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Defaults with environment overrides applied.
    ///
    /// # Errors
    /// `PulseError::Config` if `PULSE_CONNECT_TIMEOUT_SECS` is not a
    /// positive integer.
    pub fn from_env() -> Result<Self, PulseError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults with overrides taken from `lookup` instead of the process
    /// environment.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, PulseError> {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_SERVER_URL) {
            config.server_url = url;
        }
        if let Some(path) = lookup(ENV_CREDENTIALS_PATH) {
            config.credentials_path = Some(PathBuf::from(path));
        }
        if let Some(raw) = lookup(ENV_CONNECT_TIMEOUT_SECS) {
            let secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| {
                    PulseError::Config(format!(
                        "{ENV_CONNECT_TIMEOUT_SECS} must be a positive integer, got {raw:?}"
                    ))
                })?;
            config.realtime.connect_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(
        pairs: &[(&str, &str)],
    ) -> impl Fn(&str) -> Option<String> + use<> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_empty_env_uses_defaults() {
        let config = ClientConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.server_url, "ws://127.0.0.1:8080");
        assert!(config.credentials_path.is_none());
        assert_eq!(config.realtime.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_from_lookup_applies_overrides() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            (ENV_SERVER_URL, "wss://rt.example.com/ws"),
            (ENV_CREDENTIALS_PATH, "/tmp/pulse/creds.json"),
            (ENV_CONNECT_TIMEOUT_SECS, "3"),
        ]))
        .unwrap();

        assert_eq!(config.server_url, "wss://rt.example.com/ws");
        assert_eq!(
            config.credentials_path,
            Some(PathBuf::from("/tmp/pulse/creds.json"))
        );
        assert_eq!(config.realtime.connect_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_from_lookup_bad_timeout_is_config_error() {
        for raw in ["soon", "0", "-1"] {
            let result = ClientConfig::from_lookup(lookup_from(&[(
                ENV_CONNECT_TIMEOUT_SECS,
                raw,
            )]));
            assert!(matches!(result, Err(PulseError::Config(_))), "{raw}");
        }
    }
}
