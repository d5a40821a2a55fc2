//! End-to-end hub tests over loopback WebSockets.

use std::time::Duration;

use earshot_common::{ParticipantId, Position};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::{HubConfig, RelayHub};
use crate::protocol::{ClientMessage, HubMessage};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);
const QUIET: Duration = Duration::from_millis(200);

fn id(s: &str) -> ParticipantId {
    ParticipantId::new(s).unwrap()
}

async fn start_hub(ping_interval: Duration) -> RelayHub {
    RelayHub::start(HubConfig {
        bind_address: "127.0.0.1:0".into(),
        ping_interval,
        outbound_queue: 64,
    })
    .await
    .unwrap()
}

async fn quiet_hub() -> RelayHub {
    start_hub(Duration::from_secs(3600)).await
}

async fn connect(hub: &RelayHub) -> Client {
    let (ws, _) = connect_async(format!("ws://{}", hub.local_addr()))
        .await
        .unwrap();
    ws
}

async fn send(client: &mut Client, message: ClientMessage) {
    client
        .send(Message::Binary(message.encode().into()))
        .await
        .unwrap();
}

async fn recv(client: &mut Client) -> HubMessage {
    loop {
        let frame = timeout(WAIT, client.next())
            .await
            .expect("timed out waiting for hub frame")
            .expect("connection closed")
            .expect("websocket error");
        match frame {
            Message::Binary(data) => return HubMessage::decode(&data).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame {other:?}"),
        }
    }
}

async fn assert_silent(client: &mut Client) {
    if let Ok(frame) = timeout(QUIET, client.next()).await {
        panic!("expected no frame, got {frame:?}");
    }
}

/// Wait for the hub to close the connection, returning any binary frames
/// that arrived first.
async fn drain_until_closed(client: &mut Client) -> Vec<Vec<u8>> {
    let mut frames = Vec::new();
    loop {
        match timeout(WAIT, client.next()).await.expect("connection stayed open") {
            Some(Ok(Message::Binary(data))) => frames.push(data.to_vec()),
            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return frames,
            Some(Ok(_)) => {}
        }
    }
}

/// Connect, identify, and consume the `InitPlayers` reply.
async fn join(hub: &RelayHub, name: &str) -> (Client, Vec<(ParticipantId, Position)>) {
    let mut client = connect(hub).await;
    send(&mut client, ClientMessage::Identify(id(name))).await;
    loop {
        match recv(&mut client).await {
            HubMessage::InitPlayers(peers) => return (client, peers),
            HubMessage::Ping => continue,
            other => panic!("expected InitPlayers, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn first_peer_gets_empty_init_players() {
    let hub = quiet_hub().await;
    let (_a, peers) = join(&hub, "a").await;
    assert!(peers.is_empty());
    assert_eq!(hub.registry().identified_count().await, 1);
    hub.shutdown().await;
}

#[tokio::test]
async fn update_is_broadcast_to_everyone_but_the_sender() {
    let hub = quiet_hub().await;
    let (mut a, _) = join(&hub, "a").await;
    let (mut b, _) = join(&hub, "b").await;
    let (mut c, _) = join(&hub, "c").await;

    let position = Position::new(10.0, -4.0, 1);
    send(&mut a, ClientMessage::Update(position)).await;

    let expected = HubMessage::Position {
        participant: id("a"),
        position,
    };
    assert_eq!(recv(&mut b).await, expected);
    assert_eq!(recv(&mut c).await, expected);

    assert_silent(&mut a).await;
    assert_silent(&mut b).await;
    assert_silent(&mut c).await;
    hub.shutdown().await;
}

#[tokio::test]
async fn init_players_lists_current_peers_but_not_the_joiner() {
    let hub = quiet_hub().await;
    let (mut a, _) = join(&hub, "a").await;
    let (mut b, _) = join(&hub, "b").await;

    let pa = Position::new(1.0, 2.0, 1);
    let pb = Position::new(3.0, 4.0, 2);
    send(&mut a, ClientMessage::Update(pa)).await;
    recv(&mut b).await;
    send(&mut b, ClientMessage::Update(pb)).await;
    recv(&mut a).await;

    let (_d, peers) = join(&hub, "d").await;
    assert_eq!(peers, vec![(id("a"), pa), (id("b"), pb)]);
    hub.shutdown().await;
}

#[tokio::test]
async fn init_players_carries_latest_position() {
    let hub = quiet_hub().await;
    let (mut a, _) = join(&hub, "a").await;
    let (mut b, _) = join(&hub, "b").await;

    send(&mut a, ClientMessage::Update(Position::new(1.0, 1.0, 1))).await;
    recv(&mut b).await;
    send(&mut a, ClientMessage::Update(Position::new(7.0, 7.0, 1))).await;
    recv(&mut b).await;

    let (_c, peers) = join(&hub, "c").await;
    assert_eq!(peers, vec![(id("a"), Position::new(7.0, 7.0, 1))]);
    hub.shutdown().await;
}

#[tokio::test]
async fn disconnect_is_announced_once_to_identified_peers_only() {
    let hub = quiet_hub().await;
    let (mut a, _) = join(&hub, "a").await;
    let (mut b, _) = join(&hub, "b").await;
    let (mut c, _) = join(&hub, "c").await;
    let mut unidentified = connect(&hub).await;

    a.close(None).await.unwrap();

    assert_eq!(recv(&mut b).await, HubMessage::Disconnect(id("a")));
    assert_eq!(recv(&mut c).await, HubMessage::Disconnect(id("a")));
    assert_silent(&mut b).await;
    assert_silent(&mut c).await;
    assert_silent(&mut unidentified).await;
    hub.shutdown().await;
}

#[tokio::test]
async fn unidentified_disconnect_is_not_announced() {
    let hub = quiet_hub().await;
    let (mut a, _) = join(&hub, "a").await;
    let mut unidentified = connect(&hub).await;

    unidentified.close(None).await.unwrap();
    assert_silent(&mut a).await;
    hub.shutdown().await;
}

#[tokio::test]
async fn update_before_identify_is_ignored() {
    let hub = quiet_hub().await;
    let (mut a, _) = join(&hub, "a").await;
    let mut early = connect(&hub).await;

    send(&mut early, ClientMessage::Update(Position::new(5.0, 5.0, 1))).await;
    assert_silent(&mut a).await;

    // Identifying afterwards does not resurrect the dropped position.
    send(&mut early, ClientMessage::Identify(id("early"))).await;
    assert_eq!(recv(&mut early).await, HubMessage::InitPlayers(Vec::new()));
    let (_d, peers) = join(&hub, "d").await;
    assert!(peers.is_empty());
    hub.shutdown().await;
}

#[tokio::test]
async fn repeated_identify_keeps_the_first_id() {
    let hub = quiet_hub().await;
    let (mut a, _) = join(&hub, "a").await;
    let (mut b, _) = join(&hub, "b").await;

    send(&mut a, ClientMessage::Identify(id("impostor"))).await;
    assert_silent(&mut a).await;

    let position = Position::new(0.0, 0.0, 1);
    send(&mut a, ClientMessage::Update(position)).await;
    assert_eq!(
        recv(&mut b).await,
        HubMessage::Position {
            participant: id("a"),
            position,
        }
    );
    hub.shutdown().await;
}

#[tokio::test]
async fn malformed_frame_closes_only_the_offender() {
    let hub = quiet_hub().await;
    let (mut a, _) = join(&hub, "a").await;
    let (mut b, _) = join(&hub, "b").await;

    a.send(Message::Binary(vec![99u8].into())).await.unwrap();
    assert!(drain_until_closed(&mut a).await.is_empty());

    // The offender was identified, so its peers still learn it left.
    assert_eq!(recv(&mut b).await, HubMessage::Disconnect(id("a")));

    // The hub keeps serving.
    let (mut c, _) = join(&hub, "c").await;
    let position = Position::new(2.0, 2.0, 1);
    send(&mut b, ClientMessage::Update(position)).await;
    assert_eq!(
        recv(&mut c).await,
        HubMessage::Position {
            participant: id("b"),
            position,
        }
    );
    hub.shutdown().await;
}

#[tokio::test]
async fn truncated_update_closes_the_connection() {
    let hub = quiet_hub().await;
    let (mut a, _) = join(&hub, "a").await;

    let mut frame = ClientMessage::Update(Position::new(1.0, 1.0, 1)).encode();
    frame.truncate(10);
    a.send(Message::Binary(frame.into())).await.unwrap();
    assert!(drain_until_closed(&mut a).await.is_empty());
    hub.shutdown().await;
}

#[tokio::test]
async fn text_frame_closes_the_connection() {
    let hub = quiet_hub().await;
    let mut client = connect(&hub).await;

    client
        .send(Message::Text("{\"type\":\"hello\"}".into()))
        .await
        .unwrap();
    assert!(drain_until_closed(&mut client).await.is_empty());
    hub.shutdown().await;
}

#[tokio::test]
async fn ping_reaches_every_connection() {
    let hub = start_hub(Duration::from_millis(50)).await;
    let (mut a, _) = join(&hub, "a").await;
    let mut unidentified = connect(&hub).await;

    assert_eq!(recv(&mut a).await, HubMessage::Ping);
    assert_eq!(recv(&mut unidentified).await, HubMessage::Ping);

    // Pong is bookkeeping only: nobody hears about it.
    let (mut b, _) = join(&hub, "b").await;
    send(&mut a, ClientMessage::Pong).await;
    assert_eq!(recv(&mut b).await, HubMessage::Ping);
    hub.shutdown().await;
}

#[tokio::test]
async fn shutdown_closes_connections_without_disconnect_storm() {
    let hub = quiet_hub().await;
    let (mut a, _) = join(&hub, "a").await;
    let (mut b, _) = join(&hub, "b").await;
    let addr = hub.local_addr();

    hub.shutdown().await;

    assert!(drain_until_closed(&mut a).await.is_empty());
    assert!(drain_until_closed(&mut b).await.is_empty());
    assert!(connect_async(format!("ws://{addr}")).await.is_err());
}
