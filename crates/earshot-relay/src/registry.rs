//! Peer registry: maps hub connections to the participant they identified as
//! and tracks each participant's last known position.
//!
//! The only state shared between connection tasks. Every access goes through
//! one `RwLock`, and no lock is held across a network send.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use earshot_common::{ConnectionId, ParticipantId, Position};
use tokio::sync::{mpsc, RwLock};

/// Outbound frame queue of one connection.
pub type FrameSender = mpsc::Sender<Vec<u8>>;

/// Hub-side record for one live connection.
pub struct PeerEntry {
    pub addr: SocketAddr,
    /// `None` until the connection sends `Identify`.
    pub participant: Option<ParticipantId>,
    pub position: Option<Position>,
    pub connected_at: Instant,
    pub last_pong: Option<Instant>,
    tx: FrameSender,
}

/// Result of [`PeerRegistry::bind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindOutcome {
    Bound,
    /// The connection already identified; the first id stays authoritative.
    AlreadyBound(ParticipantId),
    UnknownConnection,
}

/// Thread-safe peer registry.
#[derive(Clone, Default)]
pub struct PeerRegistry {
    peers: Arc<RwLock<HashMap<ConnectionId, PeerEntry>>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a freshly accepted, still unidentified connection.
    pub async fn register(&self, conn: ConnectionId, addr: SocketAddr, tx: FrameSender) {
        self.peers.write().await.insert(
            conn,
            PeerEntry {
                addr,
                participant: None,
                position: None,
                connected_at: Instant::now(),
                last_pong: None,
                tx,
            },
        );
    }

    /// Bind `participant` to `conn`. Only the first call per connection
    /// takes effect.
    pub async fn bind(&self, conn: ConnectionId, participant: ParticipantId) -> BindOutcome {
        let mut map = self.peers.write().await;
        let Some(entry) = map.get_mut(&conn) else {
            return BindOutcome::UnknownConnection;
        };
        match &entry.participant {
            Some(existing) => BindOutcome::AlreadyBound(existing.clone()),
            None => {
                entry.participant = Some(participant);
                BindOutcome::Bound
            }
        }
    }

    /// Record a new position. Returns the bound participant, or `None` (and
    /// changes nothing) when the connection never identified.
    pub async fn update_position(
        &self,
        conn: ConnectionId,
        position: Position,
    ) -> Option<ParticipantId> {
        let mut map = self.peers.write().await;
        let entry = map.get_mut(&conn)?;
        let participant = entry.participant.clone()?;
        entry.position = Some(position);
        Some(participant)
    }

    /// Note a `Pong`. Returns the bound participant, if any.
    pub async fn record_pong(&self, conn: ConnectionId) -> Option<ParticipantId> {
        let mut map = self.peers.write().await;
        let entry = map.get_mut(&conn)?;
        entry.last_pong = Some(Instant::now());
        entry.participant.clone()
    }

    /// Drop the connection. Returns the id it was bound to so the caller can
    /// announce the departure exactly once.
    pub async fn remove(&self, conn: ConnectionId) -> Option<ParticipantId> {
        self.peers
            .write()
            .await
            .remove(&conn)
            .and_then(|entry| entry.participant)
    }

    /// Identified peers with a known position, sorted by id, leaving out
    /// `excluding`.
    pub async fn snapshot(&self, excluding: Option<&ParticipantId>) -> Vec<(ParticipantId, Position)> {
        let map = self.peers.read().await;
        let mut peers: Vec<_> = map
            .values()
            .filter_map(|entry| match (&entry.participant, entry.position) {
                (Some(participant), Some(position)) if Some(participant) != excluding => {
                    Some((participant.clone(), position))
                }
                _ => None,
            })
            .collect();
        peers.sort_by(|a, b| a.0.cmp(&b.0));
        peers
    }

    /// Queues of every identified connection other than `except`.
    pub async fn identified_senders(&self, except: Option<ConnectionId>) -> Vec<(ConnectionId, FrameSender)> {
        let map = self.peers.read().await;
        map.iter()
            .filter(|(conn, entry)| entry.participant.is_some() && Some(**conn) != except)
            .map(|(conn, entry)| (*conn, entry.tx.clone()))
            .collect()
    }

    /// Queues of every connection, identified or not.
    pub async fn all_senders(&self) -> Vec<(ConnectionId, FrameSender)> {
        let map = self.peers.read().await;
        map.iter()
            .map(|(conn, entry)| (*conn, entry.tx.clone()))
            .collect()
    }

    pub async fn participant(&self, conn: ConnectionId) -> Option<ParticipantId> {
        let map = self.peers.read().await;
        map.get(&conn).and_then(|entry| entry.participant.clone())
    }

    /// Connections that have been silent for longer than `threshold`:
    /// measured from the last `Pong`, or from the connect time if none came.
    pub async fn silent_peers(&self, threshold: Duration) -> Vec<(SocketAddr, Option<ParticipantId>)> {
        let map = self.peers.read().await;
        map.values()
            .filter(|entry| entry.last_pong.unwrap_or(entry.connected_at).elapsed() > threshold)
            .map(|entry| (entry.addr, entry.participant.clone()))
            .collect()
    }

    /// Number of live connections.
    pub async fn count(&self) -> usize {
        self.peers.read().await.len()
    }

    /// Number of connections bound to a participant.
    pub async fn identified_count(&self) -> usize {
        self.peers
            .read()
            .await
            .values()
            .filter(|entry| entry.participant.is_some())
            .count()
    }
}
