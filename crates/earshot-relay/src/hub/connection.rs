//! Per-connection handler: `Connected` → `Identified` → `Closed`.

use std::net::SocketAddr;

use earshot_common::{ConnectionId, ProtocolError};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::protocol::{ClientMessage, HubMessage};
use crate::registry::{BindOutcome, PeerRegistry};

use super::deliver;

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// Handle a single WebSocket connection until it closes.
pub(super) async fn handle_connection(
    ws: WebSocketStream<TcpStream>,
    addr: SocketAddr,
    registry: PeerRegistry,
    shutdown: CancellationToken,
    outbound_queue: usize,
) {
    let conn = ConnectionId::new();
    let (mut sink, mut stream) = ws.split();

    // 1. Register the outbound queue so broadcasts and pings can reach us.
    let (tx, mut rx) = mpsc::channel::<Vec<u8>>(outbound_queue);
    registry.register(conn, addr, tx).await;
    info!(peer = %addr, conn = %conn.short(), "Client connected");

    // 2. Serve until the transport closes, the peer misbehaves, or the hub stops.
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }

            Some(frame) = rx.recv() => {
                if let Err(e) = sink.send(Message::Binary(frame.into())).await {
                    warn!(peer = %addr, error = %e, "Send failed");
                    break;
                }
            }

            frame = stream.next() => match frame {
                Some(Ok(Message::Binary(data))) => match ClientMessage::decode(&data) {
                    Ok(message) => {
                        if let Err(e) = handle_message(message, conn, addr, &registry, &mut sink).await {
                            warn!(peer = %addr, error = %e, "Send failed");
                            break;
                        }
                    }
                    Err(e) => {
                        close_for_protocol_error(&mut sink, addr, &e).await;
                        break;
                    }
                },
                Some(Ok(Message::Text(_))) => {
                    close_for_protocol_error(&mut sink, addr, &ProtocolError::UnexpectedText).await;
                    break;
                }
                Some(Ok(Message::Ping(data))) => {
                    let _ = sink.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    warn!(peer = %addr, error = %e, "WS error");
                    break;
                }
                _ => {}
            }
        }
    }

    // 3. Retire the connection and announce the departure once.
    let departed = registry.remove(conn).await;
    match departed {
        Some(participant) if shutdown.is_cancelled() => {
            debug!(peer = %addr, participant = %participant, "Client closed by shutdown");
        }
        Some(participant) => {
            info!(peer = %addr, participant = %participant, "Client disconnected");
            let targets = registry.identified_senders(None).await;
            let frame = HubMessage::Disconnect(participant).encode();
            deliver(&targets, &frame);
        }
        None => {
            debug!(peer = %addr, conn = %conn.short(), "Unidentified client disconnected");
        }
    }
}

async fn handle_message(
    message: ClientMessage,
    conn: ConnectionId,
    addr: SocketAddr,
    registry: &PeerRegistry,
    sink: &mut WsSink,
) -> Result<(), tungstenite::Error> {
    match message {
        ClientMessage::Identify(participant) => {
            match registry.bind(conn, participant.clone()).await {
                BindOutcome::Bound => {
                    info!(peer = %addr, participant = %participant, "Client identified");
                    let peers = registry.snapshot(Some(&participant)).await;
                    debug!(participant = %participant, peers = peers.len(), "Sending initial players");
                    let frame = HubMessage::InitPlayers(peers).encode();
                    sink.send(Message::Binary(frame.into())).await?;
                }
                BindOutcome::AlreadyBound(existing) => {
                    debug!(
                        peer = %addr,
                        participant = %existing,
                        ignored = %participant,
                        "Ignoring repeated identify"
                    );
                }
                BindOutcome::UnknownConnection => {
                    debug!(peer = %addr, "Identify from unregistered connection");
                }
            }
        }
        ClientMessage::Update(position) => match registry.update_position(conn, position).await {
            Some(participant) => {
                debug!(participant = %participant, position = %position, "Position update");
                let targets = registry.identified_senders(Some(conn)).await;
                let frame = HubMessage::Position {
                    participant,
                    position,
                }
                .encode();
                deliver(&targets, &frame);
            }
            None => {
                debug!(peer = %addr, "Ignoring update before identify");
            }
        },
        ClientMessage::Pong => {
            let participant = registry.record_pong(conn).await;
            debug!(peer = %addr, participant = ?participant.as_ref().map(|p| p.as_str()), "Pong");
        }
    }
    Ok(())
}

async fn close_for_protocol_error(sink: &mut WsSink, addr: SocketAddr, error: &ProtocolError) {
    warn!(peer = %addr, error = %error, "Protocol error, closing connection");
    let _ = sink.send(Message::Close(None)).await;
}
