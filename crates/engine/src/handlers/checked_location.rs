//! Handler for outbound location checks.

use std::sync::Arc;

use tracing::debug;

use randolink_bus::{HandlerError, Message, MessageHandler, MessageKind};
use randolink_session::SessionClient;

/// Forwards checked-location reports to the session client.
pub struct SendCheckedLocationHandler {
    client: Arc<dyn SessionClient>,
}

impl SendCheckedLocationHandler {
    pub fn new(client: Arc<dyn SessionClient>) -> Self {
        Self { client }
    }
}

impl MessageHandler for SendCheckedLocationHandler {
    fn kind(&self) -> MessageKind {
        MessageKind::CheckedLocation
    }

    fn handle(&self, message: &Message) -> Result<(), HandlerError> {
        let Message::CheckedLocation { location } = message else {
            return Err(HandlerError::UnexpectedMessage {
                expected: self.kind(),
                got: message.kind(),
            });
        };

        self.client
            .report_location_checked(vec![*location])
            .map_err(|e| HandlerError::Client(e.to_string()))?;
        debug!(target: "engine::handlers", %location, "location check reported");
        Ok(())
    }
}
