//! Progression state: checked locations, completed goals, held item copies.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::ids::{ItemId, LocationId, PlayerSlot};

/// Win condition a player can declare complete.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Goal {
    /// Beat the main quest.
    Completion,
    /// Beat the main quest and clear every optional area.
    FullClear,
}

/// One item copy granted to a player by the session.
///
/// `copy` numbers the grants of a given item id to a given recipient, starting
/// at 1. Together with [`ItemCounter`] it makes application idempotent: a
/// grant whose copy number does not exceed the recipient's current count has
/// already been applied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemGrant {
    pub item: ItemId,
    pub recipient: PlayerSlot,
    pub copy: u32,
}

impl ItemGrant {
    pub fn new(item: ItemId, recipient: impl Into<PlayerSlot>, copy: u32) -> Self {
        Self {
            item,
            recipient: recipient.into(),
            copy,
        }
    }
}

/// Store for location and goal progression.
///
/// Shared between the game thread and the session worker, so implementations
/// must be internally synchronized.
pub trait ProgressionStore: Send + Sync {
    fn is_location_resolved(&self, location: LocationId) -> bool;
    fn mark_location_resolved(&self, location: LocationId);
    /// All resolved locations, sorted by id.
    fn resolved_locations(&self) -> Vec<LocationId>;
    fn is_goal_completed(&self, goal: Goal) -> bool;
    fn mark_goal_completed(&self, goal: Goal);
    fn snapshot(&self) -> ProgressionSnapshot;
    fn restore(&self, snapshot: ProgressionSnapshot);
}

/// Serializable view of progression state, embedded in save games.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressionSnapshot {
    pub resolved_locations: Vec<LocationId>,
    pub completed_goals: Vec<Goal>,
}

/// In-memory progression store.
#[derive(Default)]
pub struct MemoryProgressionStore {
    inner: RwLock<ProgressionState>,
}

#[derive(Default)]
struct ProgressionState {
    resolved: HashSet<LocationId>,
    goals: HashSet<Goal>,
}

impl MemoryProgressionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressionStore for MemoryProgressionStore {
    fn is_location_resolved(&self, location: LocationId) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .resolved
            .contains(&location)
    }

    fn mark_location_resolved(&self, location: LocationId) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .resolved
            .insert(location);
    }

    fn resolved_locations(&self) -> Vec<LocationId> {
        let state = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut resolved: Vec<_> = state.resolved.iter().copied().collect();
        resolved.sort_unstable();
        resolved
    }

    fn is_goal_completed(&self, goal: Goal) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .goals
            .contains(&goal)
    }

    fn mark_goal_completed(&self, goal: Goal) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .goals
            .insert(goal);
    }

    fn snapshot(&self) -> ProgressionSnapshot {
        let state = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut resolved_locations: Vec<_> = state.resolved.iter().copied().collect();
        resolved_locations.sort_unstable();
        let mut completed_goals: Vec<_> = state.goals.iter().copied().collect();
        completed_goals.sort_unstable();
        ProgressionSnapshot {
            resolved_locations,
            completed_goals,
        }
    }

    fn restore(&self, snapshot: ProgressionSnapshot) {
        let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        state.resolved = snapshot.resolved_locations.into_iter().collect();
        state.goals = snapshot.completed_goals.into_iter().collect();
    }
}

/// Count of item copies the local player currently holds, per item id.
///
/// The session layer reads counts to skip grants that were already applied in
/// an earlier run; the engine increments a count when it applies a grant.
pub trait ItemCounter: Send + Sync {
    fn count_of(&self, item: ItemId) -> u32;
    /// Adds one copy and returns the new count.
    fn increment(&self, item: ItemId) -> u32;
    fn snapshot(&self) -> ItemCounterSnapshot;
    fn restore(&self, snapshot: ItemCounterSnapshot);
}

/// Serializable view of held item counts, embedded in save games.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCounterSnapshot {
    pub counts: Vec<(ItemId, u32)>,
}

/// In-memory item counter.
#[derive(Default)]
pub struct MemoryItemCounter {
    counts: RwLock<HashMap<ItemId, u32>>,
}

impl MemoryItemCounter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ItemCounter for MemoryItemCounter {
    fn count_of(&self, item: ItemId) -> u32 {
        self.counts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&item)
            .copied()
            .unwrap_or(0)
    }

    fn increment(&self, item: ItemId) -> u32 {
        let mut counts = self.counts.write().unwrap_or_else(PoisonError::into_inner);
        let count = counts.entry(item).or_insert(0);
        *count += 1;
        *count
    }

    fn snapshot(&self) -> ItemCounterSnapshot {
        let counts = self.counts.read().unwrap_or_else(PoisonError::into_inner);
        let mut counts: Vec<_> = counts.iter().map(|(item, n)| (*item, *n)).collect();
        counts.sort_unstable_by_key(|(item, _)| *item);
        ItemCounterSnapshot { counts }
    }

    fn restore(&self, snapshot: ItemCounterSnapshot) {
        let mut counts = self.counts.write().unwrap_or_else(PoisonError::into_inner);
        *counts = snapshot.counts.into_iter().collect();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marks_and_reports_resolved_locations() {
        let store = MemoryProgressionStore::new();
        assert!(!store.is_location_resolved(LocationId(3)));

        store.mark_location_resolved(LocationId(3));
        store.mark_location_resolved(LocationId(1));
        store.mark_location_resolved(LocationId(3));

        assert!(store.is_location_resolved(LocationId(3)));
        assert_eq!(
            store.resolved_locations(),
            vec![LocationId(1), LocationId(3)]
        );
    }

    #[test]
    fn goal_completion_is_sticky() {
        let store = MemoryProgressionStore::new();
        assert!(!store.is_goal_completed(Goal::Completion));

        store.mark_goal_completed(Goal::Completion);
        assert!(store.is_goal_completed(Goal::Completion));
        assert!(!store.is_goal_completed(Goal::FullClear));
    }

    #[test]
    fn snapshot_restore_round_trip() {
        let store = MemoryProgressionStore::new();
        store.mark_location_resolved(LocationId(7));
        store.mark_location_resolved(LocationId(2));
        store.mark_goal_completed(Goal::FullClear);

        let snapshot = store.snapshot();
        assert_eq!(
            snapshot.resolved_locations,
            vec![LocationId(2), LocationId(7)]
        );

        let restored = MemoryProgressionStore::new();
        restored.restore(snapshot);
        assert!(restored.is_location_resolved(LocationId(7)));
        assert!(restored.is_goal_completed(Goal::FullClear));
        assert!(!restored.is_location_resolved(LocationId(9)));
    }

    #[test]
    fn counter_increments_per_item() {
        let counter = MemoryItemCounter::new();
        assert_eq!(counter.count_of(ItemId(7)), 0);

        assert_eq!(counter.increment(ItemId(7)), 1);
        assert_eq!(counter.increment(ItemId(7)), 2);
        assert_eq!(counter.increment(ItemId(9)), 1);

        assert_eq!(counter.count_of(ItemId(7)), 2);
        assert_eq!(counter.count_of(ItemId(9)), 1);
    }

    #[test]
    fn counter_snapshot_survives_restore() {
        let counter = MemoryItemCounter::new();
        counter.increment(ItemId(4));
        counter.increment(ItemId(4));
        counter.increment(ItemId(11));

        let restored = MemoryItemCounter::new();
        restored.restore(counter.snapshot());
        assert_eq!(restored.count_of(ItemId(4)), 2);
        assert_eq!(restored.count_of(ItemId(11)), 1);
        assert_eq!(restored.count_of(ItemId(5)), 0);
    }
}
