//! Game lifecycle events.
//!
//! Each event is an independent typed signal: subscribing to one event never
//! implies hearing about any other. The game emits these synchronously from
//! its own thread; subscribers run inline on the emitting thread.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use randolink_core::{EncounterId, NpcId, SaveSlot, SceneName};

/// Token returned by [`Signal::connect`], used to disconnect later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A synchronous, multi-subscriber notification for one payload type.
///
/// Subscribers are invoked in connection order. A panicking subscriber is
/// contained and logged; the remaining subscribers still run.
pub struct Signal<T> {
    subscribers: RwLock<Vec<(SubscriptionId, Callback<T>)>>,
    next_id: AtomicU64,
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Signal<T> {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn connect(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(callback)));
        id
    }

    /// Removes a subscriber. Returns false if the id was already gone.
    pub fn disconnect(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subscribers.len();
        subscribers.retain(|(sub_id, _)| *sub_id != id);
        subscribers.len() < before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Invokes every subscriber with `payload`, in connection order.
    pub fn emit(&self, payload: &T) {
        // Snapshot the list so subscribers may connect or disconnect while
        // the signal is being emitted.
        let subscribers: Vec<Callback<T>> = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();

        for callback in subscribers {
            if catch_unwind(AssertUnwindSafe(|| callback(payload))).is_err() {
                tracing::error!(target: "bus::events", "event subscriber panicked");
            }
        }
    }
}

/// The game-side notifications the randomizer reacts to.
///
/// The host game emits these; randomizer components subscribe to exactly the
/// ones they care about.
#[derive(Default)]
pub struct GameEvents {
    /// A save file is being loaded into a play session.
    pub loading_save_file: Signal<SaveSlot>,
    /// The player freed a caged NPC.
    pub npc_freed: Signal<NpcId>,
    /// The player's stats changed (level, modules, upgrades).
    pub player_stats_changed: Signal<()>,
    /// The player entered a combat encounter.
    pub entering_encounter: Signal<EncounterId>,
    /// The player left a combat encounter.
    pub exiting_encounter: Signal<EncounterId>,
    /// The player entered a named area of the world.
    pub entering_game_location: Signal<SceneName>,
    /// The play session is ending and the game returns to the title screen.
    pub exiting_game: Signal<()>,
}

impl GameEvents {
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================================
// Tests
// ============================================================================
