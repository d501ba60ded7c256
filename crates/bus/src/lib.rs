//! Durable message bus between the game and the session layer.
//!
//! `randolink-bus` carries intent in both directions without either side
//! waiting on the other: dispatchers wrap messages into envelopes and enqueue
//! them on a store, and the consumer drains the store on the game thread and
//! routes each message to its registered handler. Envelope stores survive
//! save/load, so a message enqueued before a save is still delivered after a
//! reload. It also hosts the typed game lifecycle signals the rest of the
//! system subscribes to.
pub mod consumer;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod message;
pub mod processor;
pub mod store;
pub use consumer::{ConsumeReport, CoreMessageConsumer, MessageHandler};
pub use dispatch::{CoreMessageDispatcher, EventMessageDispatcher, MessageDispatcher};
pub use error::{BusError, HandlerError, Result};
pub use events::{GameEvents, Signal, SubscriptionId};
pub use message::{Envelope, Message, MessageKind};
pub use processor::MessageProcessor;
pub use store::{
    EnvelopeStore, FileEnvelopeStore, MemoryEnvelopeStore, StoreError, StoreSnapshot,
};
