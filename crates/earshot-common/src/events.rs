use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;

use crate::id::ParticipantId;
use crate::types::Position;

/// Remote-peer changes surfaced by a relay session to its consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum PeerEvent {
    /// A remote participant reported a position (first sighting included).
    Updated {
        participant: ParticipantId,
        position: Position,
    },
    /// A remote participant's connection to the hub closed.
    Departed { participant: ParticipantId },
}

/// Local position stream with a queryable last-known snapshot.
///
/// Every subscriber gets its own unbounded queue, so every published value
/// reaches every live subscriber in order; nothing is coalesced or skipped.
#[derive(Clone, Default)]
pub struct PositionFeed {
    inner: Arc<Mutex<FeedState>>,
}

#[derive(Default)]
struct FeedState {
    last: Option<Position>,
    subscribers: Vec<mpsc::UnboundedSender<Position>>,
}

/// One consumer's view of a [`PositionFeed`].
///
/// `recv` yields `None` once every handle to the feed has been dropped and
/// the queue is drained.
#[derive(Debug)]
pub struct PositionSubscription {
    rx: mpsc::UnboundedReceiver<Position>,
}

impl PositionSubscription {
    pub async fn recv(&mut self) -> Option<Position> {
        self.rx.recv().await
    }
}

impl PositionFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> PositionSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state().subscribers.push(tx);
        PositionSubscription { rx }
    }

    /// Record `position` as last known and fan it out. Returns the number of
    /// subscribers that received it; dropped subscriptions are pruned.
    pub fn publish(&self, position: Position) -> usize {
        let mut state = self.state();
        state.last = Some(position);
        state.subscribers.retain(|tx| tx.send(position).is_ok());
        state.subscribers.len()
    }

    pub fn last_known(&self) -> Option<Position> {
        self.state().last
    }

    fn state(&self) -> MutexGuard<'_, FeedState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
