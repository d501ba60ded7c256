//! Conversion between messages and envelopes.

use crate::error::{BusError, Result};
use crate::message::{Envelope, Message};

/// Wraps messages into envelopes and unwraps them back.
///
/// Unwrapping verifies that the payload decodes to the variant the envelope's
/// tag claims; a disagreement (a foreign or corrupted envelope) is a
/// [`BusError::TypeMismatch`].
#[derive(Clone, Copy, Debug, Default)]
pub struct MessageProcessor;

impl MessageProcessor {
    pub fn new() -> Self {
        Self
    }

    pub fn wrap(&self, message: &Message) -> Result<Envelope> {
        let payload = bincode::serialize(message).map_err(|source| BusError::Encode {
            kind: message.kind(),
            source,
        })?;
        Ok(Envelope {
            kind: message.kind(),
            payload,
        })
    }

    pub fn unwrap(&self, envelope: &Envelope) -> Result<Message> {
        let message: Message =
            bincode::deserialize(&envelope.payload).map_err(|e| BusError::TypeMismatch {
                tag: envelope.kind,
                detail: e.to_string(),
            })?;
        if message.kind() != envelope.kind {
            return Err(BusError::TypeMismatch {
                tag: envelope.kind,
                detail: format!("payload decodes as {}", message.kind()),
            });
        }
        Ok(message)
    }
}

// ============================================================================
// Tests
// ============================================================================
