//! Relay session: the client side of the relay.
//!
//! One background task keeps a WebSocket connection to a hub, identifies as
//! the local participant, streams local position changes, and surfaces hub
//! traffic as [`PeerEvent`](earshot_common::PeerEvent)s.

mod client;
mod connection;
mod types;


pub use client::RelaySession;
pub use types::{normalize_hub_url, SessionConfig, SessionState};
