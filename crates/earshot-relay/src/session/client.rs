//! Public handle for a running relay session.

use earshot_common::{ParticipantId, PeerEvent, PositionFeed, RelayError};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::connection::{session_loop, SessionContext};
use super::types::{SessionConfig, SessionState};

/// Client-side relay session.
///
/// Runs in a background task until [`shutdown`](Self::shutdown) is called or,
/// with reconnection disabled, until the hub connection is lost.
pub struct RelaySession {
    local: ParticipantId,
    state: watch::Receiver<SessionState>,
    shutdown: CancellationToken,
    task: JoinHandle<Result<(), RelayError>>,
}

impl RelaySession {
    /// Connect to `config.hub_url` as `local`.
    ///
    /// Every value published on `positions` is forwarded to the hub; remote
    /// updates and departures are delivered on `events`.
    pub fn start(
        config: SessionConfig,
        local: ParticipantId,
        positions: PositionFeed,
        events: mpsc::Sender<PeerEvent>,
    ) -> Self {
        let (state_tx, state) = watch::channel(SessionState::Connecting);
        let shutdown = CancellationToken::new();

        info!(hub = %config.hub_url, participant = %local, "Starting relay session");

        let ctx = SessionContext {
            config,
            local: local.clone(),
            positions,
            events,
            state: state_tx,
            shutdown: shutdown.clone(),
        };
        let task = tokio::spawn(session_loop(ctx));

        Self {
            local,
            state,
            shutdown,
            task,
        }
    }

    pub fn local(&self) -> &ParticipantId {
        &self.local
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Subscribe to state transitions.
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Wait for the session to end on its own. Returns the error that ended
    /// it when reconnection is disabled.
    pub async fn closed(self) -> Result<(), RelayError> {
        join(self.task).await
    }

    /// Stop the session: drop the position subscription, close the
    /// transport, and wait for the task.
    pub async fn shutdown(self) -> Result<(), RelayError> {
        self.shutdown.cancel();
        join(self.task).await
    }
}

async fn join(task: JoinHandle<Result<(), RelayError>>) -> Result<(), RelayError> {
    match task.await {
        Ok(result) => result,
        Err(e) => Err(RelayError::Transport(format!("session task failed: {e}"))),
    }
}
