//! Builds the message bus, session client, engines, and lifecycle manager
//! into one runtime bundle for the host game.
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;

use randolink_bus::{
    ConsumeReport, CoreMessageConsumer, CoreMessageDispatcher, EnvelopeStore,
    EventMessageDispatcher, FileEnvelopeStore, GameEvents, MemoryEnvelopeStore, MessageDispatcher,
};
use randolink_core::{
    ContextProvider, FixedContextProvider, ItemCatalog, ItemCounter, LocationCatalog,
    MemoryItemCounter, MemoryProgressionStore, ProgressionStore, RandomizerEngine, SaveSlot,
    SessionOptions,
};
use randolink_engine::{
    ContextualEngine, EngineManager, FileSaveRepository, ManagerError, ManagerParts,
    ReceiveItemHandler, SaveRepository, SendCheckedLocationHandler, SendGoalHandler,
};
use randolink_session::{
    ClientPacket, ConnectionState, MultiworldClient, ServerPacket, SessionClient, SessionTransport,
    TransportError,
};

use crate::config::BootstrapConfig;

// ============================================================================
// Placeholder transport
// ============================================================================

/// Transport used when none is configured.
///
/// Offline play never touches it. If a networked save is loaded anyway, every
/// connection attempt fails with a message naming the missing piece instead
/// of hanging on a dead socket.
pub struct UnconfiguredTransport;

#[async_trait]
impl SessionTransport for UnconfiguredTransport {
    async fn connect(&self, _options: &SessionOptions) -> Result<(), TransportError> {
        Err(TransportError::ConnectFailed(
            "no session transport configured".into(),
        ))
    }

    async fn send(&self, _packet: ClientPacket) -> Result<(), TransportError> {
        Err(TransportError::Closed)
    }

    async fn recv(&self) -> Result<ServerPacket, TransportError> {
        Err(TransportError::Closed)
    }

    async fn close(&self) {}
}

// ============================================================================
// Builder
// ============================================================================

/// Builder that assembles store, dispatchers, consumer, session client, and
/// engine lifecycle for a game integration.
///
/// Catalogs are required; everything else has a default.
pub struct RandolinkBuilder {
    config: BootstrapConfig,
    items: Option<Arc<dyn ItemCatalog>>,
    locations: Option<Arc<dyn LocationCatalog>>,
    transport: Option<Arc<dyn SessionTransport>>,
    client: Option<Arc<dyn SessionClient>>,
    provider: Option<Arc<dyn ContextProvider>>,
    store: Option<Arc<dyn EnvelopeStore>>,
    saves: Option<Arc<dyn SaveRepository>>,
}

impl RandolinkBuilder {
    pub fn new(config: BootstrapConfig) -> Self {
        Self {
            config,
            items: None,
            locations: None,
            transport: None,
            client: None,
            provider: None,
            store: None,
            saves: None,
        }
    }

    /// Set the game's item catalog (required).
    pub fn item_catalog(mut self, items: Arc<dyn ItemCatalog>) -> Self {
        self.items = Some(items);
        self
    }

    /// Set the game's location catalog (required).
    pub fn location_catalog(mut self, locations: Arc<dyn LocationCatalog>) -> Self {
        self.locations = Some(locations);
        self
    }

    /// Set the wire transport used for networked sessions.
    pub fn transport(mut self, transport: Arc<dyn SessionTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replace the whole session client. Overrides [`transport`](Self::transport).
    pub fn session_client(mut self, client: Arc<dyn SessionClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the provider consulted for the context of fresh saves.
    ///
    /// Defaults to a fixed provider answering with the configured context.
    pub fn context_provider(mut self, provider: Arc<dyn ContextProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Replace the envelope store backend.
    pub fn envelope_store(mut self, store: Arc<dyn EnvelopeStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replace the save repository backend.
    pub fn save_repository(mut self, saves: Arc<dyn SaveRepository>) -> Self {
        self.saves = Some(saves);
        self
    }

    /// Assemble the runtime.
    ///
    /// Fails when a required catalog is missing or a file backend cannot be
    /// opened, so wiring mistakes surface at startup rather than mid-game.
    pub fn build(self) -> Result<Randolink> {
        let Self {
            config,
            items,
            locations,
            transport,
            client,
            provider,
            store,
            saves,
        } = self;

        let items = items.context("an item catalog must be provided before build")?;
        let locations = locations.context("a location catalog must be provided before build")?;

        let data_dir = config.resolve_data_dir();

        let store: Arc<dyn EnvelopeStore> = match store {
            Some(store) => store,
            None if config.durable_store => Arc::new(
                FileEnvelopeStore::open_or_create(&data_dir, "envelopes.log")
                    .context("envelope journal could not be opened")?,
            ),
            None => Arc::new(MemoryEnvelopeStore::new()),
        };

        let saves: Arc<dyn SaveRepository> = match saves {
            Some(saves) => saves,
            None => Arc::new(
                FileSaveRepository::new(data_dir.join("saves"))
                    .context("save directory could not be created")?,
            ),
        };

        let provider: Arc<dyn ContextProvider> = provider
            .unwrap_or_else(|| Arc::new(FixedContextProvider::new(config.session_context())));

        let progression: Arc<dyn ProgressionStore> = Arc::new(MemoryProgressionStore::new());
        let counter: Arc<dyn ItemCounter> = Arc::new(MemoryItemCounter::new());

        let client: Arc<dyn SessionClient> = match client {
            Some(client) => client,
            None => {
                let transport = transport.unwrap_or_else(|| Arc::new(UnconfiguredTransport));
                Arc::new(MultiworldClient::new(transport, Arc::clone(&counter)))
            }
        };

        let core_dispatcher: Arc<dyn MessageDispatcher> =
            Arc::new(CoreMessageDispatcher::new(Arc::clone(&store)));
        let event_dispatcher: Arc<dyn MessageDispatcher> =
            Arc::new(EventMessageDispatcher::new(Arc::clone(&core_dispatcher)));

        let cell = Arc::new(ContextualEngine::new());

        // Fresh grants from the connection worker go straight into whichever
        // engine is bound; an unbound engine logs and drops, and the server
        // replays undelivered grants on the next connect.
        {
            let cell = Arc::clone(&cell);
            client.set_grant_callback(Arc::new(move |grant| {
                if let Err(error) = cell.on_item_received(grant) {
                    tracing::warn!(target: "bootstrap", %error, "pushed item was not applied");
                }
            }));
        }

        let mut consumer = CoreMessageConsumer::new(Arc::clone(&store));
        consumer.add_handler(Arc::new(SendCheckedLocationHandler::new(Arc::clone(
            &client,
        ))))?;
        consumer.add_handler(Arc::new(SendGoalHandler::new(Arc::clone(&client))))?;
        consumer.add_handler(Arc::new(ReceiveItemHandler::new(
            Arc::clone(&cell) as Arc<dyn RandomizerEngine>
        )))?;

        let manager = EngineManager::new(ManagerParts {
            cell: Arc::clone(&cell),
            client: Arc::clone(&client),
            provider,
            saves,
            store: Arc::clone(&store),
            dispatcher: core_dispatcher,
            progression,
            counter,
            items,
            locations,
        });

        Ok(Randolink {
            config,
            events: GameEvents::new(),
            engine: cell,
            manager,
            client,
            consumer,
            dispatcher: event_dispatcher,
        })
    }
}

// ============================================================================
// Assembled runtime
// ============================================================================

/// The assembled randomizer runtime.
///
/// The host game drives it through three surfaces: the engine for queries and
/// checks, the events for lifecycle notifications, and [`consume`](Self::consume)
/// called once per frame to drain the message queue.
pub struct Randolink {
    config: BootstrapConfig,
    events: GameEvents,
    engine: Arc<ContextualEngine>,
    manager: EngineManager,
    client: Arc<dyn SessionClient>,
    consumer: CoreMessageConsumer,
    dispatcher: Arc<dyn MessageDispatcher>,
}

impl std::fmt::Debug for Randolink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Randolink")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Randolink {
    pub fn builder(config: BootstrapConfig) -> RandolinkBuilder {
        RandolinkBuilder::new(config)
    }

    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    /// Signals the host game fires and gameplay collaborators subscribe to.
    pub fn events(&self) -> &GameEvents {
        &self.events
    }

    /// The engine facade gameplay code queries and reports checks through.
    pub fn engine(&self) -> Arc<dyn RandomizerEngine> {
        Arc::clone(&self.engine) as Arc<dyn RandomizerEngine>
    }

    /// Dispatch surface for collaborators that publish messages directly.
    pub fn dispatcher(&self) -> Arc<dyn MessageDispatcher> {
        Arc::clone(&self.dispatcher)
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.client.connection_state()
    }

    pub fn active_slot(&self) -> Option<SaveSlot> {
        self.manager.active_slot()
    }

    /// Routes a save-file pickup into a live session.
    ///
    /// The engine is bound before the signal fires, so subscribers always see
    /// a ready engine.
    pub async fn load_save(&self, slot: SaveSlot) -> Result<(), ManagerError> {
        self.manager.on_loading_save_file(slot).await?;
        self.events.loading_save_file.emit(&slot);
        Ok(())
    }

    /// Tears the session down when the game returns to the title screen.
    ///
    /// The signal fires first so subscribers can dispatch their last
    /// messages into the queue that is about to be persisted.
    pub async fn exit_game(&self) -> Result<(), ManagerError> {
        self.events.exiting_game.emit(&());
        self.manager.on_exiting_game().await
    }

    /// Persists the active save without ending the session.
    pub fn save_game(&self) -> Result<(), ManagerError> {
        self.manager.save_game()
    }

    /// Drains pending messages through the registered handlers.
    ///
    /// Intended to be called on the game thread, once per frame.
    pub fn consume(&self) -> ConsumeReport {
        self.consumer.consume()
    }
}
