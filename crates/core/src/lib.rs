//! Core domain types and boundaries for the randomizer.
//!
//! `randolink-core` defines the vocabulary shared by every other crate:
//! identifier newtypes, session context, progression state, catalogs, and the
//! [`RandomizerEngine`] boundary the game calls into. It contains no I/O and
//! no networking; those live in the outer crates.
pub mod catalog;
pub mod engine;
pub mod ids;
pub mod progress;
pub mod session;
pub use catalog::{
    ItemCatalog, ItemInfo, LocationCatalog, LocationInfo, MemoryItemCatalog, MemoryLocationCatalog,
};
pub use engine::{EngineError, RandomizerEngine};
pub use ids::{EncounterId, ItemId, LocationId, NpcId, PlayerSlot, SaveSlot, SceneName};
pub use progress::{
    Goal, ItemCounter, ItemCounterSnapshot, ItemGrant, MemoryItemCounter, MemoryProgressionStore,
    ProgressionSnapshot, ProgressionStore,
};
pub use session::{
    ContextProvider, FixedContextProvider, SessionContext, SessionKind, SessionOptions,
};
