//! Session abstraction traits.
//!
//! Two layers:
//! - `SessionTransport`: wire-level packet exchange, no session semantics
//! - `SessionClient`: session lifecycle, outbound reports, inbound grants

use std::sync::Arc;

use async_trait::async_trait;

use randolink_core::{Goal, ItemGrant, LocationId, SessionOptions};

use crate::types::{ClientPacket, ConnectionState, ServerPacket, SessionHello};

// ============================================================================
// Error Types
// ============================================================================

/// Transport layer errors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    ConnectFailed(String),

    #[error("connection closed")]
    Closed,

    #[error("network error: {0}")]
    Network(String),

    #[error("protocol violation: {0}")]
    Protocol(String),
}

/// Session client errors.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("not connected to a session")]
    NotConnected,

    #[error("already connected to a session")]
    AlreadyConnected,

    #[error("server refused the connection: {0}")]
    Refused(String),

    #[error("outbound queue is full")]
    QueueFull,

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

// ============================================================================
// Transport Layer
// ============================================================================

/// Wire-level connection to a session server.
///
/// Implementations own framing and encoding; callers only see packets.
/// `recv` must be cancel safe: it is polled inside a `select!` loop.
#[async_trait]
pub trait SessionTransport: Send + Sync {
    /// Establishes the underlying connection.
    async fn connect(&self, options: &SessionOptions) -> Result<(), TransportError>;

    async fn send(&self, packet: ClientPacket) -> Result<(), TransportError>;

    /// Waits for the next server packet.
    async fn recv(&self) -> Result<ServerPacket, TransportError>;

    async fn close(&self);
}

// ============================================================================
// Client Layer
// ============================================================================

/// Callback invoked once per fresh grant, from the connection worker task.
pub type GrantCallback = Arc<dyn Fn(ItemGrant) + Send + Sync>;

/// Client half of a multiworld session.
///
/// Lifecycle (`connect`, `disconnect`) is async and driven by the component
/// that owns engine lifecycle. Reports are synchronous fire-and-forget so the
/// game thread can call them mid-frame; they enqueue onto the connection
/// worker and fail fast when no session is up.
#[async_trait]
pub trait SessionClient: Send + Sync {
    /// Performs the handshake and starts the connection worker.
    async fn connect(&self, options: &SessionOptions) -> Result<SessionHello, ClientError>;

    /// Stops the worker and closes the transport. Idempotent.
    async fn disconnect(&self);

    /// Reports locations the player just checked.
    fn report_location_checked(&self, locations: Vec<LocationId>) -> Result<(), ClientError>;

    /// Reports a completed goal.
    fn report_goal_completed(&self, goal: Goal) -> Result<(), ClientError>;

    /// Re-sends already-checked locations so the server can catch up on
    /// progress made while disconnected.
    fn sync_checked_locations(&self, locations: Vec<LocationId>) -> Result<(), ClientError>;

    /// Registers the callback invoked for each fresh grant. Replaces any
    /// previous callback.
    fn set_grant_callback(&self, callback: GrantCallback);

    fn connection_state(&self) -> ConnectionState;

    /// Handshake data of the active session, if connected.
    fn session_hello(&self) -> Option<SessionHello>;
}
