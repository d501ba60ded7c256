//! Engine for saves that never touch a remote session.

use std::sync::Arc;

use tracing::{debug, warn};

use randolink_core::engine::{EngineError, Result};
use randolink_core::{
    Goal, ItemGrant, ItemId, LocationCatalog, LocationId, ProgressionStore, RandomizerEngine,
};

/// Vanilla-session engine.
///
/// Every location grants its vanilla item and progression is recorded
/// locally. Nothing here reaches the message bus or the session client, so
/// offline play works identically with no server configured at all.
pub struct OfflineEngine {
    locations: Arc<dyn LocationCatalog>,
    progression: Arc<dyn ProgressionStore>,
}

impl OfflineEngine {
    pub fn new(
        locations: Arc<dyn LocationCatalog>,
        progression: Arc<dyn ProgressionStore>,
    ) -> Self {
        Self {
            locations,
            progression,
        }
    }

    fn require_location(&self, location: LocationId) -> Result<()> {
        if self.locations.contains_location(location) {
            Ok(())
        } else {
            Err(EngineError::UnknownLocation(location))
        }
    }
}

impl RandomizerEngine for OfflineEngine {
    fn item_at(&self, location: LocationId) -> Result<Option<ItemId>> {
        let info = self
            .locations
            .location(location)
            .ok_or(EngineError::UnknownLocation(location))?;
        Ok(info.vanilla_item)
    }

    fn locations_granting(&self, item: ItemId) -> Result<Vec<LocationId>> {
        Ok(self
            .locations
            .locations()
            .into_iter()
            .filter(|info| info.vanilla_item == Some(item))
            .map(|info| info.id)
            .collect())
    }

    fn check_location(&self, location: LocationId) -> Result<()> {
        self.require_location(location)?;
        if self.progression.is_location_resolved(location) {
            debug!(target: "engine::offline", %location, "location already checked");
            return Ok(());
        }
        self.progression.mark_location_resolved(location);
        debug!(target: "engine::offline", %location, "location checked");
        Ok(())
    }

    fn is_location_checked(&self, location: LocationId) -> Result<bool> {
        self.require_location(location)?;
        Ok(self.progression.is_location_resolved(location))
    }

    fn complete_goal(&self, goal: Goal) -> Result<()> {
        self.progression.mark_goal_completed(goal);
        debug!(target: "engine::offline", %goal, "goal completed");
        Ok(())
    }

    fn is_goal_completed(&self, goal: Goal) -> Result<bool> {
        Ok(self.progression.is_goal_completed(goal))
    }

    fn apply_received_item(&self, grant: &ItemGrant) -> Result<bool> {
        // Offline sessions have no grant source; anything landing here is a
        // stray replay from misconfigured wiring.
        warn!(
            target: "engine::offline",
            item = %grant.item,
            recipient = %grant.recipient,
            "ignoring item grant in an offline session"
        );
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use randolink_core::{LocationInfo, MemoryLocationCatalog, MemoryProgressionStore};

    fn engine() -> OfflineEngine {
        let locations = MemoryLocationCatalog::new([
            LocationInfo::new(LocationId(1), "Spirit Tower", Some(ItemId(10))),
            LocationInfo::new(LocationId(2), "Sunken Cache", Some(ItemId(11))),
            LocationInfo::new(LocationId(3), "Arena Prize", Some(ItemId(10))),
            LocationInfo::new(LocationId(4), "Empty Pedestal", None),
        ]);
        OfflineEngine::new(Arc::new(locations), Arc::new(MemoryProgressionStore::new()))
    }

    #[test]
    fn items_come_from_the_vanilla_layout() {
        let engine = engine();
        assert_eq!(engine.item_at(LocationId(1)).unwrap(), Some(ItemId(10)));
        assert_eq!(engine.item_at(LocationId(4)).unwrap(), None);
        assert!(matches!(
            engine.item_at(LocationId(99)),
            Err(EngineError::UnknownLocation(LocationId(99)))
        ));

        assert_eq!(
            engine.locations_granting(ItemId(10)).unwrap(),
            vec![LocationId(1), LocationId(3)]
        );
        assert_eq!(engine.locations_granting(ItemId(999)).unwrap(), vec![]);
    }

    #[test]
    fn checking_records_progression() {
        let engine = engine();
        assert!(!engine.is_location_checked(LocationId(2)).unwrap());

        engine.check_location(LocationId(2)).unwrap();
        assert!(engine.is_location_checked(LocationId(2)).unwrap());

        // A second check of the same location is a no-op.
        engine.check_location(LocationId(2)).unwrap();
        assert!(engine.is_location_checked(LocationId(2)).unwrap());
    }

    #[test]
    fn goals_are_recorded() {
        let engine = engine();
        assert!(!engine.is_goal_completed(Goal::Completion).unwrap());
        engine.complete_goal(Goal::Completion).unwrap();
        assert!(engine.is_goal_completed(Goal::Completion).unwrap());
        assert!(!engine.is_goal_completed(Goal::FullClear).unwrap());
    }

    #[test]
    fn grants_are_never_applied() {
        let engine = engine();
        let grant = ItemGrant::new(ItemId(10), "Player1", 1);
        assert!(!engine.apply_received_item(&grant).unwrap());
    }
}
