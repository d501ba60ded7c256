//! Engine for saves bound to a remote multiworld session.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use randolink_bus::{Message, MessageDispatcher};
use randolink_core::engine::{EngineError, Result};
use randolink_core::{
    Goal, ItemCatalog, ItemCounter, ItemGrant, ItemId, LocationCatalog, LocationId, PlayerSlot,
    ProgressionStore, RandomizerEngine,
};

/// Remote-session engine.
///
/// Placements come from the session handshake and replace the vanilla
/// layout. Outbound progress never touches the network directly: checks and
/// goals are dispatched onto the message bus, and the registered handlers
/// forward them to the session client when the consumer drains the store.
pub struct NetworkedEngine {
    local_slot: PlayerSlot,
    placements: HashMap<LocationId, ItemId>,
    dispatcher: Arc<dyn MessageDispatcher>,
    progression: Arc<dyn ProgressionStore>,
    counter: Arc<dyn ItemCounter>,
    items: Arc<dyn ItemCatalog>,
    locations: Arc<dyn LocationCatalog>,
}

impl NetworkedEngine {
    pub fn new(
        local_slot: PlayerSlot,
        placements: HashMap<LocationId, ItemId>,
        dispatcher: Arc<dyn MessageDispatcher>,
        progression: Arc<dyn ProgressionStore>,
        counter: Arc<dyn ItemCounter>,
        items: Arc<dyn ItemCatalog>,
        locations: Arc<dyn LocationCatalog>,
    ) -> Self {
        Self {
            local_slot,
            placements,
            dispatcher,
            progression,
            counter,
            items,
            locations,
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

impl RandomizerEngine for NetworkedEngine {
    fn item_at(&self, location: LocationId) -> Result<Option<ItemId>> {
        self.require_location(location)?;
        Ok(self.placements.get(&location).copied())
    }

    fn locations_granting(&self, item: ItemId) -> Result<Vec<LocationId>> {
        let mut granting: Vec<_> = self
            .placements
            .iter()
            .filter(|(_, placed)| **placed == item)
            .map(|(location, _)| *location)
            .collect();
        granting.sort_unstable();
        Ok(granting)
    }

    fn check_location(&self, location: LocationId) -> Result<()> {
        self.require_location(location)?;
        if self.progression.is_location_resolved(location) {
            debug!(target: "engine::networked", %location, "location already checked");
            return Ok(());
        }

        // Dispatch before marking: a failed dispatch leaves the location
        // uncheckable-as-done, so the game can retry the pickup.
        self.dispatcher
            .dispatch(Message::CheckedLocation { location })
            .map_err(|e| EngineError::Dispatch(e.to_string()))?;
        self.progression.mark_location_resolved(location);
        debug!(target: "engine::networked", %location, "location checked");
        Ok(())
    }

    fn is_location_checked(&self, location: LocationId) -> Result<bool> {
        self.require_location(location)?;
        Ok(self.progression.is_location_resolved(location))
    }

    fn complete_goal(&self, goal: Goal) -> Result<()> {
        if self.progression.is_goal_completed(goal) {
            debug!(target: "engine::networked", %goal, "goal already completed");
            return Ok(());
        }

        self.dispatcher
            .dispatch(Message::GoalCompleted { goal })
            .map_err(|e| EngineError::Dispatch(e.to_string()))?;
        self.progression.mark_goal_completed(goal);
        info!(target: "engine::networked", %goal, "goal completed");
        Ok(())
    }

    fn is_goal_completed(&self, goal: Goal) -> Result<bool> {
        Ok(self.progression.is_goal_completed(goal))
    }

    fn apply_received_item(&self, grant: &ItemGrant) -> Result<bool> {
        if grant.recipient != self.local_slot {
            debug!(
                target: "engine::networked",
                item = %grant.item,
                recipient = %grant.recipient,
                "grant addressed to another slot, not applied"
            );
            return Ok(false);
        }
        if !self.items.contains_item(grant.item) {
            return Err(EngineError::UnknownItem(grant.item));
        }

        // Redelivered grants carry a copy number at or below the held count.
        if self.counter.count_of(grant.item) >= grant.copy {
            debug!(
                target: "engine::networked",
                item = %grant.item,
                copy = grant.copy,
                "grant already applied, not applied again"
            );
            return Ok(false);
        }

        let held = self.counter.increment(grant.item);
        info!(
            target: "engine::networked",
            item = %grant.item,
            copy = grant.copy,
            held,
            "item applied"
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use randolink_bus::{
        CoreMessageDispatcher, EnvelopeStore, MemoryEnvelopeStore, MessageProcessor,
    };
    use randolink_core::{
        ItemInfo, LocationInfo, MemoryItemCatalog, MemoryItemCounter, MemoryLocationCatalog,
        MemoryProgressionStore,
    };

    struct Fixture {
        engine: NetworkedEngine,
        store: Arc<MemoryEnvelopeStore>,
        counter: Arc<MemoryItemCounter>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryEnvelopeStore::new());
        let dispatcher = Arc::new(CoreMessageDispatcher::new(store.clone()));
        let counter = Arc::new(MemoryItemCounter::new());
        let items = MemoryItemCatalog::new([
            ItemInfo::new(ItemId(10), "Boost"),
            ItemInfo::new(ItemId(11), "Supershot"),
        ]);
        let locations = MemoryLocationCatalog::new([
            LocationInfo::new(LocationId(1), "Spirit Tower", Some(ItemId(10))),
            LocationInfo::new(LocationId(2), "Sunken Cache", Some(ItemId(11))),
            LocationInfo::new(LocationId(3), "Arena Prize", Some(ItemId(10))),
        ]);
        let placements = HashMap::from([
            (LocationId(1), ItemId(11)),
            (LocationId(2), ItemId(777)),
            (LocationId(3), ItemId(11)),
        ]);

        let engine = NetworkedEngine::new(
            PlayerSlot::new("Player1"),
            placements,
            dispatcher,
            Arc::new(MemoryProgressionStore::new()),
            counter.clone(),
            Arc::new(items),
            Arc::new(locations),
        );
        Fixture {
            engine,
            store,
            counter,
        }
    }

    fn dispatched(store: &MemoryEnvelopeStore) -> Vec<Message> {
        let processor = MessageProcessor::new();
        store
            .pending()
            .unwrap()
            .into_iter()
            .map(|(_, envelope)| processor.unwrap(&envelope).unwrap())
            .collect()
    }

    #[test]
    fn placements_override_the_vanilla_layout() {
        let f = fixture();
        assert_eq!(f.engine.item_at(LocationId(1)).unwrap(), Some(ItemId(11)));
        // Items placed here for other worlds still show up.
        assert_eq!(f.engine.item_at(LocationId(2)).unwrap(), Some(ItemId(777)));
        assert!(matches!(
            f.engine.item_at(LocationId(99)),
            Err(EngineError::UnknownLocation(LocationId(99)))
        ));

        assert_eq!(
            f.engine.locations_granting(ItemId(11)).unwrap(),
            vec![LocationId(1), LocationId(3)]
        );
        assert_eq!(f.engine.locations_granting(ItemId(10)).unwrap(), vec![]);
    }

    #[test]
    fn checking_dispatches_once_and_marks_progression() {
        let f = fixture();
        f.engine.check_location(LocationId(1)).unwrap();
        assert!(f.engine.is_location_checked(LocationId(1)).unwrap());

        // The second check must not enqueue a duplicate report.
        f.engine.check_location(LocationId(1)).unwrap();
        assert_eq!(
            dispatched(&f.store),
            vec![Message::CheckedLocation {
                location: LocationId(1)
            }]
        );
    }

    #[test]
    fn unknown_locations_dispatch_nothing() {
        let f = fixture();
        assert!(f.engine.check_location(LocationId(99)).is_err());
        assert!(f.store.is_empty());
    }

    #[test]
    fn completing_a_goal_dispatches_once() {
        let f = fixture();
        f.engine.complete_goal(Goal::Completion).unwrap();
        f.engine.complete_goal(Goal::Completion).unwrap();
        assert!(f.engine.is_goal_completed(Goal::Completion).unwrap());
        assert_eq!(
            dispatched(&f.store),
            vec![Message::GoalCompleted {
                goal: Goal::Completion
            }]
        );
    }

    #[test]
    fn grants_apply_exactly_once() {
        let f = fixture();
        let grant = ItemGrant::new(ItemId(10), "Player1", 1);

        assert!(f.engine.apply_received_item(&grant).unwrap());
        assert_eq!(f.counter.count_of(ItemId(10)), 1);

        // Redelivery of the same copy is suppressed.
        assert!(!f.engine.apply_received_item(&grant).unwrap());
        assert_eq!(f.counter.count_of(ItemId(10)), 1);

        // The next copy applies.
        let second = ItemGrant::new(ItemId(10), "Player1", 2);
        assert!(f.engine.apply_received_item(&second).unwrap());
        assert_eq!(f.counter.count_of(ItemId(10)), 2);
    }

    #[test]
    fn grants_for_other_slots_are_ignored() {
        let f = fixture();
        let grant = ItemGrant::new(ItemId(10), "Player2", 1);
        assert!(!f.engine.apply_received_item(&grant).unwrap());
        assert_eq!(f.counter.count_of(ItemId(10)), 0);
    }

    #[test]
    fn unknown_items_are_rejected() {
        let f = fixture();
        let grant = ItemGrant::new(ItemId(999), "Player1", 1);
        assert!(matches!(
            f.engine.apply_received_item(&grant),
            Err(EngineError::UnknownItem(ItemId(999)))
        ));
    }
}
