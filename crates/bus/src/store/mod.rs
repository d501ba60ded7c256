//! Envelope stores.
//!
//! A store holds envelopes that were dispatched but not yet consumed. Delivery
//! is at-least-once: an envelope stays in the store until it is acknowledged,
//! and a crash between handling and acknowledgement redelivers it.

mod error;
mod file;
mod memory;

pub use error::StoreError;
pub use file::FileEnvelopeStore;
pub use memory::MemoryEnvelopeStore;

use serde::{Deserialize, Serialize};

use crate::message::Envelope;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Ordered, acknowledgeable envelope storage.
///
/// Sequence numbers are assigned by the store, strictly increase in enqueue
/// order, and are never reused, even across [`restore`](EnvelopeStore::restore).
pub trait EnvelopeStore: Send + Sync {
    /// Adds an envelope and returns its sequence number.
    ///
    /// The envelope is durably recorded before this returns, to the degree the
    /// implementation supports durability at all.
    fn enqueue(&self, envelope: Envelope) -> Result<u64>;

    /// All unacknowledged envelopes in enqueue order.
    fn pending(&self) -> Result<Vec<(u64, Envelope)>>;

    /// Removes one envelope by sequence number.
    fn acknowledge(&self, seq: u64) -> Result<()>;

    /// Number of unacknowledged envelopes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops acknowledged history from durable storage, if the implementation
    /// keeps any.
    fn compact(&self) -> Result<()> {
        Ok(())
    }

    /// Serializable view of the store, embedded in save games.
    fn snapshot(&self) -> Result<StoreSnapshot>;

    /// Replaces the store contents with a previously taken snapshot.
    ///
    /// The sequence counter only moves forward: restoring an old snapshot
    /// never hands out sequence numbers that were already used.
    fn restore(&self, snapshot: StoreSnapshot) -> Result<()>;
}

/// Serializable view of an envelope store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub next_seq: u64,
    pub pending: Vec<(u64, Envelope)>,
}
