//! Static item and location catalogs for the local game world.
//!
//! Catalogs describe what exists, not what happened: they are immutable after
//! construction and carry no progression state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ids::{ItemId, LocationId};

/// Descriptive record for one item id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInfo {
    pub id: ItemId,
    pub name: String,
}

impl ItemInfo {
    pub fn new(id: ItemId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Descriptive record for one check location in the local world.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationInfo {
    pub id: LocationId,
    pub name: String,
    /// Item found here when no randomized placement is in effect.
    pub vanilla_item: Option<ItemId>,
}

impl LocationInfo {
    pub fn new(id: LocationId, name: impl Into<String>, vanilla_item: Option<ItemId>) -> Self {
        Self {
            id,
            name: name.into(),
            vanilla_item,
        }
    }
}

/// Lookup of the items the local game knows about.
pub trait ItemCatalog: Send + Sync {
    fn item(&self, id: ItemId) -> Option<ItemInfo>;
    /// All known items, sorted by id.
    fn items(&self) -> Vec<ItemInfo>;

    fn contains_item(&self, id: ItemId) -> bool {
        self.item(id).is_some()
    }
}

/// Lookup of the check locations the local game knows about.
pub trait LocationCatalog: Send + Sync {
    fn location(&self, id: LocationId) -> Option<LocationInfo>;
    /// All known locations, sorted by id.
    fn locations(&self) -> Vec<LocationInfo>;

    fn contains_location(&self, id: LocationId) -> bool {
        self.location(id).is_some()
    }
}

/// Item catalog backed by a map built at startup.
#[derive(Default)]
pub struct MemoryItemCatalog {
    items: HashMap<ItemId, ItemInfo>,
}

impl MemoryItemCatalog {
    pub fn new(items: impl IntoIterator<Item = ItemInfo>) -> Self {
        Self {
            items: items.into_iter().map(|info| (info.id, info)).collect(),
        }
    }
}

impl ItemCatalog for MemoryItemCatalog {
    fn item(&self, id: ItemId) -> Option<ItemInfo> {
        self.items.get(&id).cloned()
    }

    fn items(&self) -> Vec<ItemInfo> {
        let mut items: Vec<_> = self.items.values().cloned().collect();
        items.sort_unstable_by_key(|info| info.id);
        items
    }
}

/// Location catalog backed by a map built at startup.
#[derive(Default)]
pub struct MemoryLocationCatalog {
    locations: HashMap<LocationId, LocationInfo>,
}

impl MemoryLocationCatalog {
    pub fn new(locations: impl IntoIterator<Item = LocationInfo>) -> Self {
        Self {
            locations: locations.into_iter().map(|info| (info.id, info)).collect(),
        }
    }
}

impl LocationCatalog for MemoryLocationCatalog {
    fn location(&self, id: LocationId) -> Option<LocationInfo> {
        self.locations.get(&id).cloned()
    }

    fn locations(&self) -> Vec<LocationInfo> {
        let mut locations: Vec<_> = self.locations.values().cloned().collect();
        locations.sort_unstable_by_key(|info| info.id);
        locations
    }
}

// ============================================================================
// Tests
// ============================================================================
