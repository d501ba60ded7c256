//! Engine selection, lifecycle, and message handlers.
//!
//! # Architecture
//!
//! ```text
//! EngineManager (save load / game exit)
//!   ├─→ ContextualEngine (one stable engine facade for the game)
//!   │     └─ OfflineEngine | NetworkedEngine, rebound per save file
//!   ├─→ SessionClient (connect, reconcile, disconnect)
//!   └─→ SaveRepository (persisted session state per save slot)
//!
//! Handlers (registered into the bus consumer)
//!   ├─ SendCheckedLocationHandler ─→ SessionClient
//!   ├─ SendGoalHandler ───────────→ SessionClient
//!   └─ ReceiveItemHandler ────────→ ContextualEngine
//! ```
//!
//! The game only ever talks to the [`ContextualEngine`]; which concrete
//! engine answers is decided once per save-file load by the
//! [`EngineManager`] and never changes mid-session.

mod contextual;
mod handlers;
mod manager;
mod networked;
mod offline;
mod save;

#[cfg(test)]
mod testing;

pub use contextual::ContextualEngine;
pub use handlers::{ReceiveItemHandler, SendCheckedLocationHandler, SendGoalHandler};
pub use manager::{EngineManager, ManagerError, ManagerParts};
pub use networked::NetworkedEngine;
pub use offline::OfflineEngine;
pub use save::{FileSaveRepository, MemorySaveRepository, SaveError, SaveGame, SaveRepository};
