//! File-based SaveRepository implementation.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use randolink_core::{SaveSlot, SessionKind};

use super::{SaveError, SaveGame, SaveRepository};

/// Sidecar summary written next to each save.
///
/// The save itself is bincode; the sidecar exists so a person poking around
/// the save directory can tell the slots apart without decoding anything.
#[derive(Debug, Serialize, Deserialize)]
struct SaveMetadata {
    slot: u32,
    saved_at: DateTime<Utc>,
    context: SessionKind,
    resolved_locations: usize,
    pending_envelopes: usize,
}

/// Stores each slot as `save_{slot}.bin` in bincode format, with a
/// `save_{slot}.json` metadata sidecar.
pub struct FileSaveRepository {
    base_dir: PathBuf,
}

impl FileSaveRepository {
    /// Creates a repository rooted at `base_dir`, creating the directory if
    /// it does not exist yet.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self, SaveError> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir).map_err(SaveError::Io)?;
        Ok(Self { base_dir })
    }

    fn save_path(&self, slot: SaveSlot) -> PathBuf {
        self.base_dir.join(format!("save_{}.bin", slot.0))
    }

    fn metadata_path(&self, slot: SaveSlot) -> PathBuf {
        self.base_dir.join(format!("save_{}.json", slot.0))
    }

    /// Slots that currently have save data, in ascending order.
    pub fn list_slots(&self) -> Result<Vec<SaveSlot>, SaveError> {
        let mut slots = Vec::new();

        let entries = fs::read_dir(&self.base_dir).map_err(SaveError::Io)?;
        for entry in entries {
            let entry = entry.map_err(SaveError::Io)?;
            let path = entry.path();

            if let Some(filename) = path.file_name().and_then(|s| s.to_str())
                && let Some(slot_str) = filename
                    .strip_prefix("save_")
                    .and_then(|s| s.strip_suffix(".bin"))
                && let Ok(slot) = slot_str.parse::<u32>()
            {
                slots.push(SaveSlot(slot));
            }
        }

        slots.sort_unstable();
        Ok(slots)
    }

    fn write_metadata(&self, slot: SaveSlot, game: &SaveGame) -> Result<(), SaveError> {
        let metadata = SaveMetadata {
            slot: slot.0,
            saved_at: Utc::now(),
            context: game.context.kind(),
            resolved_locations: game.progression.resolved_locations.len(),
            pending_envelopes: game.envelopes.pending.len(),
        };

        let path = self.metadata_path(slot);
        let temp_path = path.with_extension("json.tmp");

        let json = serde_json::to_string_pretty(&metadata)
            .map_err(|e| SaveError::Serialization(e.to_string()))?;
        fs::write(&temp_path, json).map_err(SaveError::Io)?;
        fs::rename(&temp_path, &path).map_err(SaveError::Io)?;

        Ok(())
    }
}

impl SaveRepository for FileSaveRepository {
    fn save(&self, slot: SaveSlot, game: &SaveGame) -> Result<(), SaveError> {
        let path = self.save_path(slot);
        let temp_path = path.with_extension("bin.tmp");

        let bytes =
            bincode::serialize(game).map_err(|e| SaveError::Serialization(e.to_string()))?;

        // Write to a temp file, then rename over the old save so a crash
        // mid-write never leaves a truncated slot behind.
        fs::write(&temp_path, bytes).map_err(SaveError::Io)?;
        fs::rename(&temp_path, &path).map_err(SaveError::Io)?;

        self.write_metadata(slot, game)?;

        tracing::debug!(slot = %slot, path = %path.display(), "saved slot");

        Ok(())
    }

    fn load(&self, slot: SaveSlot) -> Result<Option<SaveGame>, SaveError> {
        let path = self.save_path(slot);

        if !path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&path).map_err(SaveError::Io)?;
        let game: SaveGame =
            bincode::deserialize(&bytes).map_err(|e| SaveError::Serialization(e.to_string()))?;

        tracing::debug!(slot = %slot, path = %path.display(), "loaded slot");

        Ok(Some(game))
    }

    fn delete(&self, slot: SaveSlot) -> Result<(), SaveError> {
        let path = self.save_path(slot);
        if path.exists() {
            fs::remove_file(&path).map_err(SaveError::Io)?;
            tracing::debug!(slot = %slot, "deleted slot");
        }

        let metadata = self.metadata_path(slot);
        if metadata.exists() {
            fs::remove_file(&metadata).map_err(SaveError::Io)?;
        }

        Ok(())
    }
}
