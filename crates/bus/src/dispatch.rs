//! Message dispatchers.

use std::sync::Arc;

use crate::error::Result;
use crate::message::Message;
use crate::processor::MessageProcessor;
use crate::store::EnvelopeStore;

/// Entry point for putting messages on the bus.
///
/// Dispatch is enqueue-only: it never talks to the network and never invokes
/// handlers, so it is safe to call from any thread, including mid-frame on the
/// game thread.
pub trait MessageDispatcher: Send + Sync {
    fn dispatch(&self, message: Message) -> Result<()>;
}

/// Dispatcher that wraps messages and enqueues them on an envelope store.
pub struct CoreMessageDispatcher {
    store: Arc<dyn EnvelopeStore>,
    processor: MessageProcessor,
}

impl CoreMessageDispatcher {
    pub fn new(store: Arc<dyn EnvelopeStore>) -> Self {
        Self {
            store,
            processor: MessageProcessor::new(),
        }
    }
}

impl MessageDispatcher for CoreMessageDispatcher {
    fn dispatch(&self, message: Message) -> Result<()> {
        let kind = message.kind();
        let envelope = self.processor.wrap(&message)?;
        let seq = self.store.enqueue(envelope)?;
        tracing::debug!(target: "bus::dispatch", %kind, seq, "enqueued message");
        Ok(())
    }
}

/// Dispatcher handed to game-thread event callbacks.
///
/// Same enqueue semantics as [`CoreMessageDispatcher`]; it exists so messages
/// born inside event callbacks are distinguishable in logs from messages
/// dispatched by other components.
pub struct EventMessageDispatcher {
    inner: Arc<dyn MessageDispatcher>,
}

impl EventMessageDispatcher {
    pub fn new(inner: Arc<dyn MessageDispatcher>) -> Self {
        Self { inner }
    }
}

impl MessageDispatcher for EventMessageDispatcher {
    fn dispatch(&self, message: Message) -> Result<()> {
        tracing::trace!(
            target: "bus::dispatch",
            kind = %message.kind(),
            "dispatching from event callback"
        );
        self.inner.dispatch(message)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageKind;
    use crate::store::MemoryEnvelopeStore;
    use randolink_core::LocationId;

    #[test]
    fn dispatch_enqueues_wrapped_message() {
        let store = Arc::new(MemoryEnvelopeStore::new());
        let dispatcher = CoreMessageDispatcher::new(store.clone());

        dispatcher
            .dispatch(Message::CheckedLocation {
                location: LocationId(42),
            })
            .unwrap();

        let pending = store.pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].1.kind, MessageKind::CheckedLocation);

        let message = MessageProcessor::new().unwrap(&pending[0].1).unwrap();
        assert_eq!(
            message,
            Message::CheckedLocation {
                location: LocationId(42)
            }
        );
    }

    #[test]
    fn event_dispatcher_delegates() {
        let store = Arc::new(MemoryEnvelopeStore::new());
        let core = Arc::new(CoreMessageDispatcher::new(store.clone()));
        let dispatcher = EventMessageDispatcher::new(core);

        dispatcher
            .dispatch(Message::CheckedLocation {
                location: LocationId(7),
            })
            .unwrap();
        assert_eq!(store.len(), 1);
    }
}
