//! Message and envelope types.

use serde::{Deserialize, Serialize};

use randolink_core::{Goal, ItemGrant, LocationId};

/// Messages routed through the bus.
///
/// Outbound messages (`CheckedLocation`, `GoalCompleted`) travel from the game
/// toward the session server; `ItemReceived` travels the other way, from the
/// session toward local game state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// The player checked a location and the session must hear about it.
    CheckedLocation { location: LocationId },
    /// The player completed a goal and the session must hear about it.
    GoalCompleted { goal: Goal },
    /// The session granted an item and local game state must apply it.
    ItemReceived { grant: ItemGrant },
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::CheckedLocation { .. } => MessageKind::CheckedLocation,
            Message::GoalCompleted { .. } => MessageKind::GoalCompleted,
            Message::ItemReceived { .. } => MessageKind::ItemReceived,
        }
    }
}

/// Tag identifying a message variant, used for routing and envelope headers.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum MessageKind {
    CheckedLocation,
    GoalCompleted,
    ItemReceived,
}

/// Durable form of a message: kind tag plus opaque payload bytes.
///
/// The tag is stored next to the payload so a reader can route an envelope
/// without decoding it, and so a decoded payload can be verified against the
/// kind it claims to be.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub kind: MessageKind,
    pub payload: Vec<u8>,
}

// ============================================================================
// Tests
// ============================================================================
