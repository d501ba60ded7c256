//! Message consumer: drains the store and routes messages to handlers.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{BusError, HandlerError, Result};
use crate::message::{Message, MessageKind};
use crate::processor::MessageProcessor;
use crate::store::EnvelopeStore;

/// Processes one kind of message drained from the store.
pub trait MessageHandler: Send + Sync {
    /// Message kind this handler accepts.
    fn kind(&self) -> MessageKind;

    fn handle(&self, message: &Message) -> std::result::Result<(), HandlerError>;
}

/// Outcome of one drain pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConsumeReport {
    /// Envelopes whose handler ran successfully.
    pub handled: usize,
    /// Envelopes dropped without a handler run (type mismatch, no handler).
    pub dropped: usize,
    /// Envelopes whose handler returned an error.
    pub failed: usize,
}

impl ConsumeReport {
    pub fn processed(&self) -> usize {
        self.handled + self.dropped + self.failed
    }
}

/// Drains pending envelopes and routes each message to its handler.
///
/// One handler per message kind, registered once at startup. A drain pass
/// acknowledges every envelope it touches, including the ones whose handler
/// failed: delivery is at-least-once up to the handler invocation, and a
/// poisoned envelope must not wedge the queue behind it.
pub struct CoreMessageConsumer {
    store: Arc<dyn EnvelopeStore>,
    processor: MessageProcessor,
    handlers: HashMap<MessageKind, Arc<dyn MessageHandler>>,
}

impl CoreMessageConsumer {
    pub fn new(store: Arc<dyn EnvelopeStore>) -> Self {
        Self {
            store,
            processor: MessageProcessor::new(),
            handlers: HashMap::new(),
        }
    }

    /// Registers a handler for its message kind.
    pub fn add_handler(&mut self, handler: Arc<dyn MessageHandler>) -> Result<()> {
        let kind = handler.kind();
        if self.handlers.contains_key(&kind) {
            return Err(BusError::DuplicateHandler(kind));
        }
        self.handlers.insert(kind, handler);
        Ok(())
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Drains every envelope currently pending, in enqueue order.
    ///
    /// Intended to be called on the game thread, once per frame or on a
    /// comparable cadence.
    pub fn consume(&self) -> ConsumeReport {
        let mut report = ConsumeReport::default();

        let pending = match self.store.pending() {
            Ok(pending) => pending,
            Err(e) => {
                tracing::error!(target: "bus::consumer", error = %e, "failed to read pending envelopes");
                return report;
            }
        };

        for (seq, envelope) in pending {
            match self.processor.unwrap(&envelope) {
                Ok(message) => self.route(seq, &message, &mut report),
                Err(e) => {
                    tracing::warn!(
                        target: "bus::consumer",
                        seq,
                        kind = %envelope.kind,
                        error = %e,
                        "dropping envelope with mismatched payload"
                    );
                    report.dropped += 1;
                }
            }
            self.acknowledge(seq);
        }

        report
    }

    fn route(&self, seq: u64, message: &Message, report: &mut ConsumeReport) {
        let kind = message.kind();
        match self.handlers.get(&kind) {
            Some(handler) => match handler.handle(message) {
                Ok(()) => {
                    tracing::debug!(target: "bus::consumer", seq, %kind, "handled message");
                    report.handled += 1;
                }
                Err(e) => {
                    tracing::error!(
                        target: "bus::consumer",
                        seq,
                        %kind,
                        error = %e,
                        "handler failed, dropping message"
                    );
                    report.failed += 1;
                }
            },
            None => {
                let e = BusError::NoHandler(kind);
                tracing::warn!(target: "bus::consumer", seq, %kind, error = %e, "dropping message");
                report.dropped += 1;
            }
        }
    }

    fn acknowledge(&self, seq: u64) {
        if let Err(e) = self.store.acknowledge(seq) {
            tracing::error!(
                target: "bus::consumer",
                seq,
                error = %e,
                "failed to acknowledge envelope"
            );
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
