//! Proximity dispatcher: the seam between the relay session, the local
//! position source, and the voice sink.
//!
//! Owns the remote-peer map and is its only writer; peer events and local
//! position changes are processed one at a time on the dispatcher task.
//!
//! Sink calls never run on the event path. Each remote participant has its
//! own queue drained by a worker task, so calls for one participant reach the
//! sink in order while a slow call for one never holds up another.

use std::collections::HashMap;
use std::sync::Arc;

use earshot_common::{AudioShape, ParticipantId, PeerEvent, Position, PositionSubscription};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::proximity::voice_parameter;
use crate::sink::{VoiceParameter, VoiceSink};

pub struct ProximityDispatcher {
    local_id: ParticipantId,
    shape: AudioShape,
    local: Option<Position>,
    peers: HashMap<ParticipantId, Position>,
    voices: VoiceQueues,
}

impl ProximityDispatcher {
    /// `local` seeds the local position when the source already has one.
    pub fn new(
        local_id: ParticipantId,
        shape: AudioShape,
        sink: Arc<dyn VoiceSink>,
        local: Option<Position>,
    ) -> Self {
        Self {
            local_id,
            shape,
            local,
            peers: HashMap::new(),
            voices: VoiceQueues::new(sink),
        }
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn peer_position(&self, participant: &ParticipantId) -> Option<Position> {
        self.peers.get(participant).copied()
    }

    pub fn local_position(&self) -> Option<Position> {
        self.local
    }

    // -----------------------------------------------------------------------
    // Event handlers
    // -----------------------------------------------------------------------

    pub fn handle_peer_event(&mut self, event: PeerEvent) {
        match event {
            PeerEvent::Updated {
                participant,
                position,
            } => {
                if participant == self.local_id {
                    debug!(participant = %participant, "Ignoring update about the local participant");
                    return;
                }
                self.peers.insert(participant.clone(), position);
                if let Some(local) = self.local {
                    let parameter = voice_parameter(self.shape, &local, &position);
                    self.voices.push(participant, parameter);
                }
            }
            PeerEvent::Departed { participant } => {
                if self.peers.remove(&participant).is_some() {
                    self.voices.push(participant, VoiceParameter::Reset);
                }
            }
        }
    }

    /// Record the new local position and recompute every known peer.
    pub fn handle_local_position(&mut self, position: Position) {
        self.local = Some(position);
        for (participant, remote) in &self.peers {
            let parameter = voice_parameter(self.shape, &position, remote);
            self.voices.push(participant.clone(), parameter);
        }
    }

    /// Reset every known peer and forget them. Returns once the sink has
    /// seen every queued call, the resets included.
    pub async fn reset_all(&mut self) {
        for (participant, _) in self.peers.drain() {
            self.voices.push(participant, VoiceParameter::Reset);
        }
        self.voices.drain().await;
    }

    // -----------------------------------------------------------------------
    // Run loop
    // -----------------------------------------------------------------------

    /// Process events until `shutdown` fires or the peer event stream ends,
    /// then reset every known peer.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<PeerEvent>,
        mut local_rx: PositionSubscription,
        shutdown: CancellationToken,
    ) {
        info!(participant = %self.local_id, shape = ?self.shape, "Proximity dispatcher started");
        let mut local_open = true;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,

                event = events.recv() => match event {
                    Some(event) => self.handle_peer_event(event),
                    None => {
                        debug!("Peer event stream ended");
                        break;
                    }
                },

                position = local_rx.recv(), if local_open => match position {
                    Some(position) => self.handle_local_position(position),
                    None => {
                        debug!("Local position feed closed");
                        local_open = false;
                    }
                },
            }
        }

        let known = self.peers.len();
        self.reset_all().await;
        info!(reset = known, "Proximity dispatcher stopped");
    }
}

// ---------------------------------------------------------------------------
// Per-participant sink queues
// ---------------------------------------------------------------------------

struct VoiceWorker {
    tx: mpsc::UnboundedSender<VoiceParameter>,
    task: JoinHandle<()>,
}

/// One ordered queue and worker per participant. Workers outlive a
/// departure so a participant that comes back is still served in order.
struct VoiceQueues {
    sink: Arc<dyn VoiceSink>,
    workers: HashMap<ParticipantId, VoiceWorker>,
}

impl VoiceQueues {
    fn new(sink: Arc<dyn VoiceSink>) -> Self {
        Self {
            sink,
            workers: HashMap::new(),
        }
    }

    fn push(&mut self, participant: ParticipantId, parameter: VoiceParameter) {
        debug!(participant = %participant, parameter = ?parameter, "Voice parameter");
        let sink = &self.sink;
        let worker = self.workers.entry(participant).or_insert_with_key(|participant| {
            let (tx, rx) = mpsc::unbounded_channel();
            let task = tokio::spawn(voice_worker(Arc::clone(sink), participant.clone(), rx));
            VoiceWorker { tx, task }
        });
        if worker.tx.send(parameter).is_err() {
            warn!("Voice worker is gone, parameter dropped");
        }
    }

    /// Close every queue and wait until each worker has applied what it held.
    async fn drain(&mut self) {
        for (participant, worker) in self.workers.drain() {
            drop(worker.tx);
            if let Err(e) = worker.task.await {
                warn!(participant = %participant, error = %e, "Voice worker failed");
            }
        }
    }
}

/// Apply queued parameters in order. Anything queued behind a slow call is
/// superseded by the newest value, which is the only one the sink needs.
async fn voice_worker(
    sink: Arc<dyn VoiceSink>,
    participant: ParticipantId,
    mut rx: mpsc::UnboundedReceiver<VoiceParameter>,
) {
    while let Some(mut parameter) = rx.recv().await {
        while let Ok(newer) = rx.try_recv() {
            parameter = newer;
        }
        if let Err(e) = sink.set_voice_parameter(&participant, parameter).await {
            warn!(participant = %participant, error = %e, "Voice sink call failed");
        }
    }
}
