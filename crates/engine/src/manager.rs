//! Engine lifecycle bound to save-file load and game exit.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;
use tracing::{debug, info};

use randolink_bus::{EnvelopeStore, MessageDispatcher, StoreError};
use randolink_core::{
    ContextProvider, ItemCatalog, ItemCounter, LocationCatalog, LocationId, ProgressionStore,
    SaveSlot, SessionContext,
};
use randolink_session::{ClientError, SessionClient, SessionHello};

use crate::contextual::{ActiveEngine, ContextualEngine};
use crate::networked::NetworkedEngine;
use crate::offline::OfflineEngine;
use crate::save::{SaveError, SaveGame, SaveRepository};

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("a session is already active; exit it before loading another save")]
    SessionActive,

    #[error("session client error: {0}")]
    Client(#[from] ClientError),

    #[error("save repository error: {0}")]
    Save(#[from] SaveError),

    #[error("envelope store error: {0}")]
    Store(#[from] StoreError),
}

// ============================================================================
// Manager
// ============================================================================

/// Everything the manager needs to assemble engines and persist sessions.
pub struct ManagerParts {
    pub cell: Arc<ContextualEngine>,
    pub client: Arc<dyn SessionClient>,
    pub provider: Arc<dyn ContextProvider>,
    pub saves: Arc<dyn SaveRepository>,
    pub store: Arc<dyn EnvelopeStore>,
    pub dispatcher: Arc<dyn MessageDispatcher>,
    pub progression: Arc<dyn ProgressionStore>,
    pub counter: Arc<dyn ItemCounter>,
    pub items: Arc<dyn ItemCatalog>,
    pub locations: Arc<dyn LocationCatalog>,
}

struct ActiveSave {
    slot: SaveSlot,
    context: SessionContext,
}

/// Drives the contextual engine through the save lifecycle.
///
/// Loading a save restores its persisted state, connects to the session
/// server when the save is networked, and binds the matching engine. Exiting
/// persists, disconnects, and releases the engine. No other component may
/// force a context transition; a connection dropping mid-session leaves the
/// networked engine bound and surfaces as client errors instead.
pub struct EngineManager {
    cell: Arc<ContextualEngine>,
    client: Arc<dyn SessionClient>,
    provider: Arc<dyn ContextProvider>,
    saves: Arc<dyn SaveRepository>,
    store: Arc<dyn EnvelopeStore>,
    dispatcher: Arc<dyn MessageDispatcher>,
    progression: Arc<dyn ProgressionStore>,
    counter: Arc<dyn ItemCounter>,
    items: Arc<dyn ItemCatalog>,
    locations: Arc<dyn LocationCatalog>,
    active: RwLock<Option<ActiveSave>>,
}

impl EngineManager {
    pub fn new(parts: ManagerParts) -> Self {
        Self {
            cell: parts.cell,
            client: parts.client,
            provider: parts.provider,
            saves: parts.saves,
            store: parts.store,
            dispatcher: parts.dispatcher,
            progression: parts.progression,
            counter: parts.counter,
            items: parts.items,
            locations: parts.locations,
            active: RwLock::new(None),
        }
    }

    /// Slot of the loaded save file, if any.
    pub fn active_slot(&self) -> Option<SaveSlot> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|save| save.slot)
    }

    /// Starts the session for `slot`.
    ///
    /// A save that was played before keeps the context it was created with;
    /// the context provider is only asked for brand new saves.
    pub async fn on_loading_save_file(&self, slot: SaveSlot) -> Result<(), ManagerError> {
        if self
            .active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
        {
            return Err(ManagerError::SessionActive);
        }

        let saved = self.saves.load(slot)?;
        let context = match &saved {
            Some(game) => game.context.clone(),
            None => self.provider.current_context(),
        };

        // Replace whatever state the previous session left behind with this
        // save's snapshot, or with empty state for a fresh save.
        let game = saved.unwrap_or_else(|| SaveGame {
            context: context.clone(),
            progression: Default::default(),
            items: Default::default(),
            envelopes: Default::default(),
        });
        self.progression.restore(game.progression);
        self.counter.restore(game.items);
        self.store.restore(game.envelopes)?;

        match &context {
            SessionContext::Offline => {
                self.cell.bind(ActiveEngine::Offline(OfflineEngine::new(
                    self.locations.clone(),
                    self.progression.clone(),
                )));
                info!(target: "engine::manager", %slot, "offline session started");
            }
            SessionContext::Networked(options) => {
                let hello = self.client.connect(options).await?;
                if let Err(e) = self.reconcile(&hello) {
                    self.client.disconnect().await;
                    return Err(e);
                }

                let SessionHello {
                    slot: local_slot,
                    placements,
                    ..
                } = hello;
                info!(
                    target: "engine::manager",
                    %slot,
                    slot_name = %local_slot,
                    placements = placements.len(),
                    "networked session started"
                );
                self.cell.bind(ActiveEngine::Networked(NetworkedEngine::new(
                    local_slot,
                    placements,
                    self.dispatcher.clone(),
                    self.progression.clone(),
                    self.counter.clone(),
                    self.items.clone(),
                    self.locations.clone(),
                )));
            }
        }

        *self.active.write().unwrap_or_else(PoisonError::into_inner) =
            Some(ActiveSave { slot, context });
        Ok(())
    }

    /// Ends the session: persists, disconnects, releases the engine.
    ///
    /// Safe to call with no session active.
    pub async fn on_exiting_game(&self) -> Result<(), ManagerError> {
        let Some(save) = self
            .active
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            debug!(target: "engine::manager", "exit without an active session");
            return Ok(());
        };

        // Teardown always runs to completion; a failed persist is reported
        // after the session is released.
        let persisted = self.persist(save.slot, &save.context);
        if save.context.is_networked() {
            self.client.disconnect().await;
        }
        self.cell.release();
        info!(target: "engine::manager", slot = %save.slot, "session ended");
        persisted
    }

    /// Persists the active session's state to its save slot.
    pub fn save_game(&self) -> Result<(), ManagerError> {
        let active = self.active.read().unwrap_or_else(PoisonError::into_inner);
        match active.as_ref() {
            Some(save) => self.persist(save.slot, &save.context),
            None => {
                debug!(target: "engine::manager", "no active session, nothing to persist");
                Ok(())
            }
        }
    }

    /// Lines up local progression with the server's view of this slot.
    fn reconcile(&self, hello: &SessionHello) -> Result<(), ManagerError> {
        let server: HashSet<LocationId> = hello.checked_locations.iter().copied().collect();

        // Checks another run of this slot reported while we were away.
        for &location in &hello.checked_locations {
            if !self.progression.is_location_resolved(location) {
                self.progression.mark_location_resolved(location);
            }
        }

        // Checks we made that never reached the server.
        let unreported: Vec<LocationId> = self
            .progression
            .resolved_locations()
            .into_iter()
            .filter(|location| !server.contains(location))
            .collect();
        if !unreported.is_empty() {
            info!(
                target: "engine::manager",
                count = unreported.len(),
                "reporting locations checked while disconnected"
            );
            self.client.sync_checked_locations(unreported)?;
        }
        Ok(())
    }

    fn persist(&self, slot: SaveSlot, context: &SessionContext) -> Result<(), ManagerError> {
        let game = SaveGame {
            context: context.clone(),
            progression: self.progression.snapshot(),
            items: self.counter.snapshot(),
            envelopes: self.store.snapshot()?,
        };
        let pending = game.envelopes.pending.len();
        self.saves.save(slot, &game)?;
        self.store.compact()?;
        debug!(target: "engine::manager", %slot, pending, "session state persisted");
        Ok(())
    }
}
