//! Background session loop with optional reconnect.

use std::collections::HashSet;

use earshot_common::{
    ParticipantId, PeerEvent, Position, PositionFeed, PositionSubscription, ProtocolError, RelayError,
};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::protocol::{ClientMessage, HubMessage};

use super::types::{SessionConfig, SessionState};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

/// Everything the background task owns.
pub(super) struct SessionContext {
    pub(super) config: SessionConfig,
    pub(super) local: ParticipantId,
    pub(super) positions: PositionFeed,
    pub(super) events: mpsc::Sender<PeerEvent>,
    pub(super) state: watch::Sender<SessionState>,
    pub(super) shutdown: CancellationToken,
}

impl SessionContext {
    fn set_state(&self, state: SessionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "Session state");
        }
    }

    async fn emit(&self, event: PeerEvent) {
        if self.events.send(event).await.is_err() {
            debug!("Peer event receiver dropped");
        }
    }
}

// ---------------------------------------------------------------------------
// Connection Loop
// ---------------------------------------------------------------------------

/// Connect, stream, and (optionally) reconnect until cancelled.
///
/// Returns `Ok(())` after a requested shutdown and the last error when the
/// connection is lost with reconnection disabled.
pub(super) async fn session_loop(ctx: SessionContext) -> Result<(), RelayError> {
    let mut delay = ctx.config.reconnect_delay;

    loop {
        ctx.set_state(SessionState::Connecting);
        info!(hub = %ctx.config.hub_url, "Connecting to relay hub");

        let attempt = tokio::select! {
            _ = ctx.shutdown.cancelled() => {
                ctx.set_state(SessionState::Closed);
                return Ok(());
            }
            attempt = connect(&ctx.config) => attempt,
        };

        let outcome = match attempt {
            Ok(ws) => {
                delay = ctx.config.reconnect_delay;
                ctx.set_state(SessionState::Connected);
                stream_session(ws, &ctx).await
            }
            Err(e) => Err(e),
        };

        let error = match outcome {
            Ok(()) => {
                ctx.set_state(SessionState::Closed);
                info!("Relay session closed");
                return Ok(());
            }
            Err(e) => e,
        };

        if !ctx.config.reconnect {
            warn!(hub = %ctx.config.hub_url, error = %error, "Relay session ended");
            ctx.set_state(SessionState::Closed);
            return Err(error);
        }

        warn!(
            hub = %ctx.config.hub_url,
            error = %error,
            retry_in = ?delay,
            "Relay connection lost, reconnecting"
        );
        tokio::select! {
            _ = ctx.shutdown.cancelled() => {
                ctx.set_state(SessionState::Closed);
                return Ok(());
            }
            _ = tokio::time::sleep(delay) => {}
        }
        delay = ctx.config.next_delay(delay);
    }
}

async fn connect(config: &SessionConfig) -> Result<WsStream, RelayError> {
    match tokio::time::timeout(
        config.connect_timeout,
        tokio_tungstenite::connect_async(config.hub_url.as_str()),
    )
    .await
    {
        Ok(Ok((ws, _))) => Ok(ws),
        Ok(Err(e)) => Err(RelayError::Connect(format!("{}: {e}", config.hub_url))),
        Err(_) => Err(RelayError::ConnectTimeout(config.connect_timeout)),
    }
}

// ---------------------------------------------------------------------------
// Streaming
// ---------------------------------------------------------------------------

/// Run one connection. `Ok(())` means shutdown was requested; any error
/// means the connection is gone.
async fn stream_session(ws: WsStream, ctx: &SessionContext) -> Result<(), RelayError> {
    let (mut sink, mut stream) = ws.split();
    // Remote ids heard on this connection, retired if it drops.
    let mut seen: HashSet<ParticipantId> = HashSet::new();

    // Subscribe before identifying so no local change falls in between.
    let mut local_rx = Some(ctx.positions.subscribe());

    send(&mut sink, ClientMessage::Identify(ctx.local.clone())).await?;
    ctx.set_state(SessionState::Streaming);
    info!(participant = %ctx.local, "Identified to relay hub");

    let result = loop {
        tokio::select! {
            _ = ctx.shutdown.cancelled() => break Ok(()),

            Some(position) = next_local(&mut local_rx) => {
                debug!(position = %position, "Sending local position");
                if let Err(e) = send(&mut sink, ClientMessage::Update(position)).await {
                    break Err(e);
                }
            }

            frame = stream.next() => match frame {
                Some(Ok(Message::Binary(data))) => match HubMessage::decode(&data) {
                    Ok(message) => {
                        if let Err(e) = handle_message(message, &mut sink, ctx, &mut seen).await {
                            break Err(e);
                        }
                    }
                    Err(e) => break Err(e.into()),
                },
                Some(Ok(Message::Text(_))) => break Err(ProtocolError::UnexpectedText.into()),
                Some(Ok(Message::Close(_))) | None => {
                    break Err(RelayError::Transport("hub closed the connection".into()));
                }
                Some(Err(e)) => break Err(RelayError::Transport(e.to_string())),
                _ => {}
            }
        }
    };

    // Unsubscribe first so nothing is sent on a closing transport.
    drop(local_rx);

    match &result {
        Ok(()) => {
            let _ = sink.send(Message::Close(None)).await;
        }
        Err(RelayError::Protocol(e)) => {
            warn!(error = %e, "Protocol error from hub, closing connection");
            let _ = sink.send(Message::Close(None)).await;
            retire_seen(ctx, &mut seen).await;
        }
        Err(_) => retire_seen(ctx, &mut seen).await,
    }

    result
}

async fn handle_message(
    message: HubMessage,
    sink: &mut WsSink,
    ctx: &SessionContext,
    seen: &mut HashSet<ParticipantId>,
) -> Result<(), RelayError> {
    match message {
        HubMessage::InitPlayers(peers) => {
            debug!(peers = peers.len(), "Received initial players");
            for (participant, position) in peers {
                seen.insert(participant.clone());
                ctx.emit(PeerEvent::Updated {
                    participant,
                    position,
                })
                .await;
            }
            // Let the peers that were already there hear us right away.
            if let Some(position) = ctx.positions.last_known() {
                send(sink, ClientMessage::Update(position)).await?;
            }
        }
        HubMessage::Position {
            participant,
            position,
        } => {
            debug!(participant = %participant, position = %position, "Remote position");
            seen.insert(participant.clone());
            ctx.emit(PeerEvent::Updated {
                participant,
                position,
            })
            .await;
        }
        HubMessage::Disconnect(participant) => {
            info!(participant = %participant, "Peer left");
            seen.remove(&participant);
            ctx.emit(PeerEvent::Departed { participant }).await;
        }
        HubMessage::Ping => {
            debug!("Ping");
            send(sink, ClientMessage::Pong).await?;
        }
    }
    Ok(())
}

/// The hub forgets everything about a dropped connection, so peers heard
/// through it are stale until the next `InitPlayers`.
async fn retire_seen(ctx: &SessionContext, seen: &mut HashSet<ParticipantId>) {
    for participant in seen.drain() {
        ctx.emit(PeerEvent::Departed { participant }).await;
    }
}

async fn send(sink: &mut WsSink, message: ClientMessage) -> Result<(), RelayError> {
    sink.send(Message::Binary(message.encode().into()))
        .await
        .map_err(|e| RelayError::Transport(e.to_string()))
}

/// Next local position. Pends forever once the feed is gone.
async fn next_local(rx: &mut Option<PositionSubscription>) -> Option<Position> {
    let Some(receiver) = rx.as_mut() else {
        return std::future::pending().await;
    };
    match receiver.recv().await {
        Some(position) => Some(position),
        None => {
            debug!("Local position feed closed");
            *rx = None;
            std::future::pending().await
        }
    }
}
