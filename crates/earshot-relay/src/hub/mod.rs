//! Relay hub: accepts WebSocket connections, binds each to a participant,
//! and rebroadcasts position updates to every other identified peer.

mod connection;

#[cfg(test)]
mod tests;

use std::net::SocketAddr;
use std::time::Duration;

use earshot_common::{ConnectionId, RelayError};
use tokio::net::TcpListener;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::protocol::HubMessage;
use crate::registry::{FrameSender, PeerRegistry};

use self::connection::handle_connection;

/// Upper bound on the WebSocket upgrade of a freshly accepted socket.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Address to listen on, e.g. `0.0.0.0:8970`.
    pub bind_address: String,
    /// Period of the `Ping` sweep.
    pub ping_interval: Duration,
    /// Per-connection outbound queue depth. Frames for a full queue are dropped.
    pub outbound_queue: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8970".into(),
            ping_interval: Duration::from_secs(15),
            outbound_queue: 256,
        }
    }
}

// ---------------------------------------------------------------------------
// Hub
// ---------------------------------------------------------------------------

/// A running hub. Dropping it leaves the background tasks running; call
/// [`RelayHub::shutdown`] to stop them.
pub struct RelayHub {
    local_addr: SocketAddr,
    registry: PeerRegistry,
    shutdown: CancellationToken,
    accept_task: JoinHandle<()>,
    ping_task: JoinHandle<()>,
}

impl RelayHub {
    /// Bind the listener and start the accept and ping loops.
    pub async fn start(config: HubConfig) -> Result<Self, RelayError> {
        let listener = TcpListener::bind(&config.bind_address)
            .await
            .map_err(|e| RelayError::Bind(format!("{}: {e}", config.bind_address)))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| RelayError::Bind(e.to_string()))?;

        info!(addr = %local_addr, "Relay hub listening");

        let registry = PeerRegistry::new();
        let shutdown = CancellationToken::new();

        let accept_task = tokio::spawn(accept_loop(
            listener,
            registry.clone(),
            shutdown.clone(),
            config.outbound_queue,
        ));
        let ping_task = tokio::spawn(ping_loop(
            registry.clone(),
            config.ping_interval,
            shutdown.clone(),
        ));

        Ok(Self {
            local_addr,
            registry,
            shutdown,
            accept_task,
            ping_task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    /// Stop accepting, close every connection, and wait for all tasks.
    ///
    /// Departures caused by the shutdown itself are not broadcast.
    pub async fn shutdown(self) {
        info!(addr = %self.local_addr, "Shutting down relay hub");
        self.shutdown.cancel();
        if let Err(e) = self.ping_task.await {
            error!(error = %e, "Ping task failed");
        }
        if let Err(e) = self.accept_task.await {
            error!(error = %e, "Accept task failed");
        }
        info!("Relay hub stopped");
    }
}

// ---------------------------------------------------------------------------
// Accept loop
// ---------------------------------------------------------------------------

async fn accept_loop(
    listener: TcpListener,
    registry: PeerRegistry,
    shutdown: CancellationToken,
    outbound_queue: usize,
) {
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,

            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    let registry = registry.clone();
                    let shutdown = shutdown.clone();
                    connections.spawn(async move {
                        let handshake = tokio::time::timeout(
                            HANDSHAKE_TIMEOUT,
                            tokio_tungstenite::accept_async(stream),
                        );
                        let ws = tokio::select! {
                            _ = shutdown.cancelled() => return,
                            result = handshake => result,
                        };
                        match ws {
                            Ok(Ok(ws)) => {
                                handle_connection(ws, addr, registry, shutdown, outbound_queue).await
                            }
                            Ok(Err(e)) => {
                                warn!(peer = %addr, error = %e, "WS handshake failed");
                            }
                            Err(_) => {
                                warn!(peer = %addr, "WS handshake timed out");
                            }
                        }
                    });
                }
                Err(e) => {
                    warn!(error = %e, "TCP accept error");
                }
            },

            Some(finished) = connections.join_next(), if !connections.is_empty() => {
                if let Err(e) = finished {
                    error!(error = %e, "Connection task failed");
                }
            }
        }
    }

    drop(listener);
    debug!(open = connections.len(), "Waiting for connections to close");
    while let Some(finished) = connections.join_next().await {
        if let Err(e) = finished {
            error!(error = %e, "Connection task failed");
        }
    }
}

// ---------------------------------------------------------------------------
// Liveness
// ---------------------------------------------------------------------------

/// Ping every connection once per `period`. Silence is only logged;
/// disconnection stays transport-driven.
async fn ping_loop(registry: PeerRegistry, period: Duration, shutdown: CancellationToken) {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = interval.tick() => {}
        }

        let targets = registry.all_senders().await;
        let delivered = deliver(&targets, &HubMessage::Ping.encode());
        debug!(connections = targets.len(), delivered, "Ping sweep");

        for (addr, participant) in registry.silent_peers(period * 2).await {
            match participant {
                Some(participant) => {
                    warn!(peer = %addr, participant = %participant, "No pong in the last two ping intervals");
                }
                None => {
                    warn!(peer = %addr, "Unidentified connection has not answered pings");
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Fan-out
// ---------------------------------------------------------------------------

/// Queue `frame` on every target without waiting. A full queue drops the
/// frame for that peer only. Returns how many queues accepted it.
pub(crate) fn deliver(targets: &[(ConnectionId, FrameSender)], frame: &[u8]) -> usize {
    let mut delivered = 0;
    for (conn, tx) in targets {
        match tx.try_send(frame.to_vec()) {
            Ok(()) => delivered += 1,
            Err(TrySendError::Full(_)) => {
                warn!(conn = %conn.short(), "Outbound queue full, dropping frame");
            }
            Err(TrySendError::Closed(_)) => {
                debug!(conn = %conn.short(), "Outbound queue closed");
            }
        }
    }
    delivered
}
