//! Per-link task: dial, handshake, then pump frames until the link ends.
//!
//! One task runs per transport generation. It never touches connection
//! state directly; everything it learns is sent to the actor as a
//! `(Generation, LinkEvent)` pair and applied there by the state machine.
//! The flow is:
//!   1. Dial the connector
//!   2. Send `Handshake`, wait for a matching `HandshakeAck`
//!   3. Report `Accepted` with the live link
//!   4. Loop: translate inbound frames, send heartbeats, watch for idle

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use pulse_protocol::{Codec, Frame, ProtocolError, SystemMessage, UserId};
use pulse_session::Token;
use pulse_transport::{Connector, Link};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior};

use crate::{CloseReason, Generation, LinkEvent, RealtimeConfig, RealtimeError};

/// Channel the link tasks report into. Unbounded so a link task never
/// blocks on a busy actor.
pub(crate) type EventSender<L> =
    mpsc::UnboundedSender<(Generation, LinkEvent<Arc<L>>)>;

pub(crate) type EventReceiver<L> =
    mpsc::UnboundedReceiver<(Generation, LinkEvent<Arc<L>>)>;

/// Everything one transport generation needs.
pub(crate) struct LinkTask<C: Connector, K: Codec> {
    pub(crate) generation: Generation,
    pub(crate) user_id: UserId,
    pub(crate) token: Option<Token>,
    pub(crate) connector: Arc<C>,
    pub(crate) codec: K,
    pub(crate) config: RealtimeConfig,
    pub(crate) events: EventSender<C::Link>,
}

impl<C: Connector, K: Codec> LinkTask<C, K> {
    pub(crate) fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        let generation = self.generation;

        let link = match self.establish().await {
            Ok(link) => Arc::new(link),
            Err(e) => {
                tracing::debug!(%generation, error = %e, "link not established");
                self.emit(LinkEvent::Failed(e.to_string()));
                return;
            }
        };

        tracing::debug!(%generation, link = %link.id(), "handshake accepted");
        if !self.emit(LinkEvent::Accepted(Arc::clone(&link))) {
            let _ = link.close().await;
            return;
        }

        let ending = self.pump(&link).await;
        self.emit(ending);
    }

    /// Dials and handshakes under a single `connect_timeout` deadline.
    async fn establish(&self) -> Result<C::Link, RealtimeError> {
        let limit = self.config.connect_timeout;
        let deadline = Instant::now() + limit;

        let link = tokio::time::timeout_at(deadline, self.connector.connect())
            .await
            .map_err(|_| RealtimeError::HandshakeTimeout(limit))??;

        match tokio::time::timeout_at(deadline, self.handshake(&link)).await {
            Ok(Ok(())) => Ok(link),
            Ok(Err(e)) => {
                let _ = link.close().await;
                Err(e)
            }
            Err(_) => {
                let _ = link.close().await;
                Err(RealtimeError::HandshakeTimeout(limit))
            }
        }
    }

    /// Sends the handshake and waits for the server's answer.
    async fn handshake(&self, link: &C::Link) -> Result<(), RealtimeError> {
        let token = self.token.as_ref().map(|t| t.expose().to_string());
        let hello = Frame::handshake(self.user_id.clone(), token);
        link.send(&self.codec.encode(&hello)?).await?;

        loop {
            let Some(data) = link.recv().await? else {
                return Err(RealtimeError::ClosedDuringHandshake(
                    "link closed".into(),
                ));
            };

            let frame: Frame = match self.codec.decode(&data) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::debug!(error = %e, "skipping malformed frame");
                    continue;
                }
            };

            match frame {
                Frame::System(SystemMessage::HandshakeAck { user_id, .. }) => {
                    if user_id != self.user_id {
                        return Err(RealtimeError::Protocol(
                            ProtocolError::InvalidMessage(format!(
                                "handshake acknowledged for {user_id}, expected {}",
                                self.user_id
                            )),
                        ));
                    }
                    return Ok(());
                }
                Frame::System(SystemMessage::Error { code, message }) => {
                    return Err(RealtimeError::HandshakeRejected {
                        code,
                        message,
                    });
                }
                Frame::System(SystemMessage::Disconnect { reason }) => {
                    return Err(RealtimeError::ClosedDuringHandshake(reason));
                }
                other => {
                    tracing::debug!(
                        frame = frame_kind(&other),
                        "ignoring frame before handshake ack"
                    );
                }
            }
        }
    }

    /// Runs an accepted link until it ends. Returns the terminal event.
    async fn pump(&self, link: &C::Link) -> LinkEvent<Arc<C::Link>> {
        let generation = self.generation;
        let idle_timeout = self.config.idle_timeout;

        let period = self.config.heartbeat_interval.max(Duration::from_millis(1));
        let mut heartbeat =
            tokio::time::interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last_seen = Instant::now();

        loop {
            tokio::select! {
                received = link.recv() => {
                    let data = match received {
                        Ok(Some(data)) => data,
                        Ok(None) => {
                            return LinkEvent::Closed(CloseReason::TransportClosed);
                        }
                        Err(e) => {
                            return LinkEvent::Failed(
                                RealtimeError::Transport(e).to_string(),
                            );
                        }
                    };
                    last_seen = Instant::now();

                    let frame: Frame = match self.codec.decode(&data) {
                        Ok(frame) => frame,
                        Err(e) => {
                            tracing::debug!(%generation, error = %e, "skipping malformed frame");
                            continue;
                        }
                    };

                    match frame {
                        Frame::App(payload) => {
                            if !self.emit(LinkEvent::App(payload)) {
                                return LinkEvent::Closed(CloseReason::ClientDisconnect);
                            }
                        }
                        Frame::System(SystemMessage::Presence { users }) => {
                            if !self.emit(LinkEvent::Presence(users)) {
                                return LinkEvent::Closed(CloseReason::ClientDisconnect);
                            }
                        }
                        Frame::System(SystemMessage::Disconnect { reason }) => {
                            return LinkEvent::Closed(CloseReason::ServerDisconnect { reason });
                        }
                        Frame::System(SystemMessage::HeartbeatAck { client_time, .. }) => {
                            tracing::trace!(%generation, client_time, "heartbeat acknowledged");
                        }
                        Frame::System(SystemMessage::Error { code, message }) => {
                            tracing::warn!(%generation, code, %message, "server reported an error");
                        }
                        other => {
                            tracing::debug!(%generation, frame = frame_kind(&other), "ignoring unexpected frame");
                        }
                    }
                }

                _ = heartbeat.tick() => {
                    let beat = Frame::System(SystemMessage::Heartbeat {
                        client_time: unix_millis(),
                    });
                    let sent = match self.codec.encode(&beat) {
                        Ok(bytes) => link.send(&bytes).await.map_err(RealtimeError::from),
                        Err(e) => Err(RealtimeError::from(e)),
                    };
                    if let Err(e) = sent {
                        return LinkEvent::Failed(e.to_string());
                    }
                }

                _ = tokio::time::sleep_until(last_seen + idle_timeout) => {
                    tracing::warn!(%generation, ?idle_timeout, "link went quiet");
                    return LinkEvent::Failed(
                        RealtimeError::IdleTimeout(idle_timeout).to_string(),
                    );
                }
            }
        }
    }

    /// Reports to the actor. `false` means the actor is gone.
    fn emit(&self, event: LinkEvent<Arc<C::Link>>) -> bool {
        self.events.send((self.generation, event)).is_ok()
    }
}

fn frame_kind(frame: &Frame) -> &'static str {
    match frame {
        Frame::App(_) => "App",
        Frame::System(msg) => match msg {
            SystemMessage::Handshake { .. } => "Handshake",
            SystemMessage::HandshakeAck { .. } => "HandshakeAck",
            SystemMessage::Disconnect { .. } => "Disconnect",
            SystemMessage::Presence { .. } => "Presence",
            SystemMessage::JoinRoom { .. } => "JoinRoom",
            SystemMessage::LeaveRoom { .. } => "LeaveRoom",
            SystemMessage::Heartbeat { .. } => "Heartbeat",
            SystemMessage::HeartbeatAck { .. } => "HeartbeatAck",
            SystemMessage::Error { .. } => "Error",
        },
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
