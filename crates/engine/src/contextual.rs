//! Context-routing engine facade.

use std::sync::{PoisonError, RwLock};

use tracing::{debug, warn};

use randolink_core::engine::{EngineError, Result};
use randolink_core::{Goal, ItemGrant, ItemId, LocationId, RandomizerEngine, SessionKind};

use crate::networked::NetworkedEngine;
use crate::offline::OfflineEngine;

/// The engine variant serving the loaded save file.
pub(crate) enum ActiveEngine {
    Offline(OfflineEngine),
    Networked(NetworkedEngine),
}

impl ActiveEngine {
    fn kind(&self) -> SessionKind {
        match self {
            ActiveEngine::Offline(_) => SessionKind::Offline,
            ActiveEngine::Networked(_) => SessionKind::Networked,
        }
    }

    fn as_engine(&self) -> &dyn RandomizerEngine {
        match self {
            ActiveEngine::Offline(engine) => engine,
            ActiveEngine::Networked(engine) => engine,
        }
    }
}

/// The one engine the game ever sees.
///
/// Holds the offline or networked engine for the currently loaded save file,
/// or nothing between sessions. Only the engine manager rebinds it, and only
/// at save load and exit boundaries; a mid-session connection loss does not
/// change the active variant.
#[derive(Default)]
pub struct ContextualEngine {
    active: RwLock<Option<ActiveEngine>>,
}

impl ContextualEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session kind currently being served, if a save file is loaded.
    pub fn context(&self) -> Option<SessionKind> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(ActiveEngine::kind)
    }

    /// Routes a live grant push from the session worker.
    ///
    /// Live pushes skip the envelope store: the grant is applied against the
    /// active engine right away, and idempotent application covers the case
    /// where the same grant later arrives again through the bus.
    pub fn on_item_received(&self, grant: ItemGrant) -> Result<()> {
        let guard = self.active.read().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(ActiveEngine::Networked(engine)) => {
                engine.apply_received_item(&grant)?;
                Ok(())
            }
            Some(ActiveEngine::Offline(_)) => {
                warn!(
                    target: "engine::contextual",
                    item = %grant.item,
                    "dropping item grant received in an offline session"
                );
                Ok(())
            }
            None => Err(EngineError::NotInitialized),
        }
    }

    pub(crate) fn bind(&self, engine: ActiveEngine) {
        let kind = engine.kind();
        *self.active.write().unwrap_or_else(PoisonError::into_inner) = Some(engine);
        debug!(target: "engine::contextual", context = %kind, "engine bound");
    }

    pub(crate) fn release(&self) {
        *self.active.write().unwrap_or_else(PoisonError::into_inner) = None;
        debug!(target: "engine::contextual", "engine released");
    }

    fn with_active<R>(&self, op: impl FnOnce(&dyn RandomizerEngine) -> Result<R>) -> Result<R> {
        let guard = self.active.read().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(active) => op(active.as_engine()),
            None => Err(EngineError::NotInitialized),
        }
    }
}

impl RandomizerEngine for ContextualEngine {
    fn item_at(&self, location: LocationId) -> Result<Option<ItemId>> {
        self.with_active(|engine| engine.item_at(location))
    }

    fn locations_granting(&self, item: ItemId) -> Result<Vec<LocationId>> {
        self.with_active(|engine| engine.locations_granting(item))
    }

    fn check_location(&self, location: LocationId) -> Result<()> {
        self.with_active(|engine| engine.check_location(location))
    }

    fn is_location_checked(&self, location: LocationId) -> Result<bool> {
        self.with_active(|engine| engine.is_location_checked(location))
    }

    fn complete_goal(&self, goal: Goal) -> Result<()> {
        self.with_active(|engine| engine.complete_goal(goal))
    }

    fn is_goal_completed(&self, goal: Goal) -> Result<bool> {
        self.with_active(|engine| engine.is_goal_completed(goal))
    }

    fn apply_received_item(&self, grant: &ItemGrant) -> Result<bool> {
        self.with_active(|engine| engine.apply_received_item(grant))
    }
}
