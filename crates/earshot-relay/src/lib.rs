//! earshot-relay: the position relay.
//!
//! The hub half accepts WebSocket connections and fans each participant's
//! position out to everyone else. The session half is the client side: it
//! keeps one connection to a hub alive, streams the local position, and
//! turns hub traffic into [`PeerEvent`](earshot_common::PeerEvent)s.

pub mod hub;
pub mod protocol;
pub mod registry;
pub mod session;

pub use hub::{HubConfig, RelayHub};
pub use protocol::{ClientMessage, HubMessage};
pub use registry::PeerRegistry;
pub use session::{normalize_hub_url, RelaySession, SessionConfig, SessionState};
