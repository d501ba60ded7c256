//! Envelope store errors.

/// Errors raised by envelope store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// Acknowledgement of a sequence number that is not pending.
    #[error("unknown envelope sequence {0}")]
    UnknownSeq(u64),

    /// The store reached its configured capacity.
    #[error("envelope store is full (capacity {capacity})")]
    Full { capacity: usize },
}
