//! Handler for inbound item grants.

use std::sync::Arc;

use tracing::debug;

use randolink_bus::{HandlerError, Message, MessageHandler, MessageKind};
use randolink_core::RandomizerEngine;

/// Applies granted items to local game state through the active engine.
///
/// Live pushes apply directly and never touch the bus; this handler serves
/// grants that were dispatched as messages, such as ones a save reload
/// brought back in the durable store. The engine's apply path is idempotent,
/// so a grant arriving on both paths is applied once.
pub struct ReceiveItemHandler {
    engine: Arc<dyn RandomizerEngine>,
}

impl ReceiveItemHandler {
    pub fn new(engine: Arc<dyn RandomizerEngine>) -> Self {
        Self { engine }
    }
}

impl MessageHandler for ReceiveItemHandler {
    fn kind(&self) -> MessageKind {
        MessageKind::ItemReceived
    }

    fn handle(&self, message: &Message) -> Result<(), HandlerError> {
        let Message::ItemReceived { grant } = message else {
            return Err(HandlerError::UnexpectedMessage {
                expected: self.kind(),
                got: message.kind(),
            });
        };

        let applied = self
            .engine
            .apply_received_item(grant)
            .map_err(|e| HandlerError::Engine(e.to_string()))?;
        debug!(
            target: "engine::handlers",
            item = %grant.item,
            copy = grant.copy,
            applied,
            "item grant handled"
        );
        Ok(())
    }
}
