//! Session protocol types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use randolink_core::{Goal, ItemId, LocationId, PlayerSlot};

/// Handshake request, sent as the first client packet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectRequest {
    pub slot_name: String,
    pub password: Option<String>,
    pub death_link: bool,
}

/// Packets the client sends to the session server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientPacket {
    Connect(ConnectRequest),
    /// Locations the player has checked. Also used to catch the server up
    /// after a reconnect.
    LocationChecks { locations: Vec<LocationId> },
    /// The player reached a goal.
    StatusUpdate { goal: Goal },
}

/// Packets the session server sends to the client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerPacket {
    /// Handshake accepted.
    Connected {
        slot: PlayerSlot,
        /// Locations this slot already checked in earlier sessions.
        checked_locations: Vec<LocationId>,
        /// Item placed at each location of this slot's world.
        placements: Vec<(LocationId, ItemId)>,
    },
    /// Handshake rejected.
    ConnectionRefused { reason: String },
    /// Grants for this slot, in stream order.
    ItemsPushed { grants: Vec<NetworkGrant> },
}

/// One grant in the server's item stream.
///
/// `index` is the grant's position in the slot's full stream. The server may
/// resend any prefix of the stream (it replays everything on reconnect), so
/// the index is what identifies a duplicate delivery.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkGrant {
    pub index: u64,
    pub item: ItemId,
    pub recipient: PlayerSlot,
}

/// Result of a successful handshake.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionHello {
    pub slot: PlayerSlot,
    /// Locations this slot already checked in earlier sessions.
    pub checked_locations: Vec<LocationId>,
    /// Item placed at each location of this slot's world.
    pub placements: HashMap<LocationId, ItemId>,
}

/// Connection status, answered from memory without touching the network.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// The connection dropped; the reason is kept for status displays.
    Lost { reason: String },
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}
