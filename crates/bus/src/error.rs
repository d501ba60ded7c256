//! Error types for the message bus.

use crate::message::MessageKind;
use crate::store::StoreError;

/// Errors raised by bus components.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// An envelope was drained whose kind no handler is registered for.
    #[error("no handler registered for {0} messages")]
    NoHandler(MessageKind),

    /// Handler registration collided with an existing handler.
    #[error("a handler for {0} messages is already registered")]
    DuplicateHandler(MessageKind),

    /// An envelope's kind tag disagrees with its payload.
    #[error("envelope tagged {tag} does not carry a {tag} message: {detail}")]
    TypeMismatch { tag: MessageKind, detail: String },

    #[error("failed to encode {kind} message: {source}")]
    Encode {
        kind: MessageKind,
        source: bincode::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, BusError>;

/// Failure reported by a message handler.
///
/// Handler failures never escape the consumer's drain loop; they are logged
/// and the envelope is still acknowledged.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The consumer routed a message to a handler of the wrong kind.
    #[error("handler for {expected} messages received a {got} message")]
    UnexpectedMessage {
        expected: MessageKind,
        got: MessageKind,
    },

    #[error("session client call failed: {0}")]
    Client(String),

    #[error("engine rejected the message: {0}")]
    Engine(String),
}
