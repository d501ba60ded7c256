//! The randomizer engine boundary.

use crate::ids::{ItemId, LocationId};
use crate::progress::{Goal, ItemGrant};

/// Errors surfaced by randomizer engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// No engine is bound: no save file is loaded, or teardown already ran.
    #[error("randomizer engine is not initialized")]
    NotInitialized,

    #[error("unknown location {0}")]
    UnknownLocation(LocationId),

    #[error("unknown item {0}")]
    UnknownItem(ItemId),

    /// A message could not be handed to the bus.
    #[error("failed to dispatch message: {0}")]
    Dispatch(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Game-facing randomizer operations.
///
/// The game holds exactly one engine for the lifetime of the process and
/// routes every operation through it. Which implementation answers depends on
/// the session context of the loaded save file; callers never find out.
pub trait RandomizerEngine: Send + Sync {
    /// Item granted when `location` is checked, if a placement is known.
    fn item_at(&self, location: LocationId) -> Result<Option<ItemId>>;

    /// Locations in the local world that grant `item`, sorted by id.
    fn locations_granting(&self, item: ItemId) -> Result<Vec<LocationId>>;

    /// Records that the player checked `location`.
    fn check_location(&self, location: LocationId) -> Result<()>;

    fn is_location_checked(&self, location: LocationId) -> Result<bool>;

    /// Declares `goal` complete.
    fn complete_goal(&self, goal: Goal) -> Result<()>;

    fn is_goal_completed(&self, goal: Goal) -> Result<bool>;

    /// Applies one granted item copy to local game state.
    ///
    /// Returns `Ok(true)` when the grant was applied and `Ok(false)` when it
    /// was skipped: addressed to another player, already applied, or no
    /// session is active.
    fn apply_received_item(&self, grant: &ItemGrant) -> Result<bool>;
}
