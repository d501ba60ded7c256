//! In-memory SaveRepository implementation.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use randolink_core::SaveSlot;

use super::{SaveError, SaveGame, SaveRepository};

/// Keeps saves in memory. Useful for tests and fully offline sessions.
#[derive(Default)]
pub struct MemorySaveRepository {
    slots: Mutex<HashMap<SaveSlot, SaveGame>>,
}

impl MemorySaveRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SaveRepository for MemorySaveRepository {
    fn save(&self, slot: SaveSlot, game: &SaveGame) -> Result<(), SaveError> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(slot, game.clone());
        Ok(())
    }

    fn load(&self, slot: SaveSlot) -> Result<Option<SaveGame>, SaveError> {
        Ok(self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&slot)
            .cloned())
    }

    fn delete(&self, slot: SaveSlot) -> Result<(), SaveError> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&slot);
        Ok(())
    }
}
