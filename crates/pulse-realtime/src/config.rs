//! Realtime client configuration.

use std::time::Duration;

/// Timeouts and buffer sizes for the realtime client.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use pulse_realtime::RealtimeConfig;
///
/// let config = RealtimeConfig {
///     connect_timeout: Duration::from_secs(3),
///     ..RealtimeConfig::default()
/// };
/// assert_eq!(config.idle_timeout, Duration::from_secs(30));
/// ```
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// Upper bound on dial + handshake. Expiry is a transport error.
    pub connect_timeout: Duration,

    /// How often an open link sends a `Heartbeat`.
    pub heartbeat_interval: Duration,

    /// An open link with no inbound traffic for this long is failed.
    /// Should be a few multiples of `heartbeat_interval`.
    pub idle_timeout: Duration,

    /// How long a local teardown waits for the link to close.
    pub close_timeout: Duration,

    /// Capacity of the broadcast channel for application payloads. Slow
    /// subscribers past this lag and lose the oldest payloads.
    pub event_buffer: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(30),
            close_timeout: Duration::from_secs(2),
            event_buffer: 64,
        }
    }
}
