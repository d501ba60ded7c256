//! Multiworld session layer: connection lifecycle and wire protocol.
//!
//! # Architecture
//!
//! ```text
//! MultiworldClient (lifecycle + handshake)
//!   ├─→ SessionTransport (Layer 0: framed packets over some medium)
//!   └─→ ConnectionWorker (background task)
//!         ├─ forwards queued reports to the transport
//!         └─ surfaces pushed item grants through the grant callback,
//!            numbering copies and skipping grants already applied
//! ```
//!
//! The client owns exactly one session at a time. Reports are fire-and-forget
//! from the caller's point of view: they land in a bounded queue and the
//! worker delivers them in order. Pushed grants are deduplicated twice, once
//! by stream position (re-pushed batches) and once against the persistent
//! item counter (replays after a reload).

mod mock;
mod multiworld;
mod traits;
mod types;
mod worker;

pub use mock::MockTransport;
pub use multiworld::MultiworldClient;
pub use traits::{ClientError, GrantCallback, SessionClient, SessionTransport, TransportError};
pub use types::{
    ClientPacket, ConnectRequest, ConnectionState, NetworkGrant, ServerPacket, SessionHello,
};
