//! Handler for outbound goal completion.

use std::sync::Arc;

use tracing::info;

use randolink_bus::{HandlerError, Message, MessageHandler, MessageKind};
use randolink_session::SessionClient;

/// Forwards goal completion to the session client.
pub struct SendGoalHandler {
    client: Arc<dyn SessionClient>,
}

impl SendGoalHandler {
    pub fn new(client: Arc<dyn SessionClient>) -> Self {
        Self { client }
    }
}

impl MessageHandler for SendGoalHandler {
    fn kind(&self) -> MessageKind {
        MessageKind::GoalCompleted
    }

    fn handle(&self, message: &Message) -> Result<(), HandlerError> {
        let Message::GoalCompleted { goal } = message else {
            return Err(HandlerError::UnexpectedMessage {
                expected: self.kind(),
                got: message.kind(),
            });
        };

        self.client
            .report_goal_completed(*goal)
            .map_err(|e| HandlerError::Client(e.to_string()))?;
        info!(target: "engine::handlers", %goal, "goal reported");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingClient;
    use randolink_core::Goal;

    #[test]
    fn goals_are_forwarded_to_the_client() {
        let client = Arc::new(RecordingClient::new());
        let handler = SendGoalHandler::new(client.clone());

        handler
            .handle(&Message::GoalCompleted {
                goal: Goal::FullClear,
            })
            .unwrap();
        assert_eq!(*client.goals.lock().unwrap(), vec![Goal::FullClear]);
    }

    #[test]
    fn client_failures_surface_as_handler_errors() {
        let handler = SendGoalHandler::new(Arc::new(RecordingClient::failing()));
        let result = handler.handle(&Message::GoalCompleted {
            goal: Goal::Completion,
        });
        assert!(matches!(result, Err(HandlerError::Client(_))));
    }
}
