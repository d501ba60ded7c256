//! Per-slot save data shared by the engines and the message bus.
//!
//! Progression, held-item counts and not-yet-delivered envelopes are
//! snapshotted together so a reload restores one coherent point in time.

mod file;
mod memory;

pub use file::FileSaveRepository;
pub use memory::MemorySaveRepository;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use randolink_bus::StoreSnapshot;
use randolink_core::{ItemCounterSnapshot, ProgressionSnapshot, SaveSlot, SessionContext};

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("save storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("save data could not be encoded or decoded: {0}")]
    Serialization(String),
}

// ============================================================================
// Save data
// ============================================================================

/// Everything the randomizer persists per save slot.
///
/// The session context is stored so a save started against a remote session
/// reconnects to the same kind of session on reload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveGame {
    pub context: SessionContext,
    pub progression: ProgressionSnapshot,
    pub items: ItemCounterSnapshot,
    pub envelopes: StoreSnapshot,
}

// ============================================================================
// Repository
// ============================================================================

/// Storage backend for [`SaveGame`] data, keyed by save slot.
pub trait SaveRepository: Send + Sync {
    fn save(&self, slot: SaveSlot, game: &SaveGame) -> Result<(), SaveError>;

    fn load(&self, slot: SaveSlot) -> Result<Option<SaveGame>, SaveError>;

    /// Removes the slot's data. Removing an absent slot is not an error.
    fn delete(&self, slot: SaveSlot) -> Result<(), SaveError>;
}
