//! Multiworld session client.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{error, info};

use randolink_core::{Goal, ItemCounter, LocationId, SessionOptions};

use crate::traits::{ClientError, GrantCallback, SessionClient, SessionTransport, TransportError};
use crate::types::{ClientPacket, ConnectRequest, ConnectionState, ServerPacket, SessionHello};
use crate::worker::{ConnectionWorker, Outbound};

/// Reports queued per session before backpressure kicks in.
const OUTBOUND_QUEUE_DEPTH: usize = 64;

/// Session client backed by a [`SessionTransport`].
///
/// Holds at most one session at a time. The async lifecycle methods perform
/// the handshake and manage the connection worker; the sync report methods
/// hand packets to the worker without blocking the caller.
pub struct MultiworldClient {
    transport: Arc<dyn SessionTransport>,
    counter: Arc<dyn ItemCounter>,
    callback: Arc<RwLock<Option<GrantCallback>>>,
    state: Arc<RwLock<ConnectionState>>,
    hello: RwLock<Option<SessionHello>>,
    outbound: RwLock<Option<mpsc::Sender<Outbound>>>,
    /// Serializes connect and disconnect.
    worker: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl MultiworldClient {
    pub fn new(transport: Arc<dyn SessionTransport>, counter: Arc<dyn ItemCounter>) -> Self {
        Self {
            transport,
            counter,
            callback: Arc::new(RwLock::new(None)),
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            hello: RwLock::new(None),
            outbound: RwLock::new(None),
            worker: tokio::sync::Mutex::new(None),
        }
    }

    async fn handshake(&self, options: &SessionOptions) -> Result<SessionHello, ClientError> {
        self.transport.connect(options).await?;
        self.transport
            .send(ClientPacket::Connect(ConnectRequest {
                slot_name: options.slot_name.clone(),
                password: options.password.clone(),
                death_link: options.death_link,
            }))
            .await?;

        match self.transport.recv().await? {
            ServerPacket::Connected {
                slot,
                checked_locations,
                placements,
            } => Ok(SessionHello {
                slot,
                checked_locations,
                placements: placements.into_iter().collect(),
            }),
            ServerPacket::ConnectionRefused { reason } => Err(ClientError::Refused(reason)),
            other => Err(ClientError::Transport(TransportError::Protocol(format!(
                "unexpected handshake reply: {other:?}"
            )))),
        }
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn send_outbound(&self, outbound: Outbound) -> Result<(), ClientError> {
        let guard = self.outbound.read().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = guard.as_ref() else {
            return Err(ClientError::NotConnected);
        };
        sender.try_send(outbound).map_err(|e| match e {
            TrySendError::Full(_) => ClientError::QueueFull,
            // The worker exited and took the receiver with it.
            TrySendError::Closed(_) => ClientError::NotConnected,
        })
    }
}

#[async_trait]
impl SessionClient for MultiworldClient {
    async fn connect(&self, options: &SessionOptions) -> Result<SessionHello, ClientError> {
        let mut worker_slot = self.worker.lock().await;
        if worker_slot.is_some() {
            return Err(ClientError::AlreadyConnected);
        }

        self.set_state(ConnectionState::Connecting);
        match self.handshake(options).await {
            Ok(hello) => {
                let (sender, receiver) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);
                *self.outbound.write().unwrap_or_else(PoisonError::into_inner) = Some(sender);
                *self.hello.write().unwrap_or_else(PoisonError::into_inner) = Some(hello.clone());
                self.set_state(ConnectionState::Connected);

                let worker = ConnectionWorker::new(
                    self.transport.clone(),
                    receiver,
                    self.counter.clone(),
                    self.callback.clone(),
                    self.state.clone(),
                    hello.slot.clone(),
                );
                *worker_slot = Some(tokio::spawn(worker.run()));

                info!(
                    target: "session::client",
                    slot = %hello.slot,
                    checked = hello.checked_locations.len(),
                    placements = hello.placements.len(),
                    "connected to session"
                );
                Ok(hello)
            }
            Err(e) => {
                self.set_state(ConnectionState::Disconnected);
                self.transport.close().await;
                Err(e)
            }
        }
    }

    async fn disconnect(&self) {
        let mut worker_slot = self.worker.lock().await;

        // Dropping the sender tells the worker to close the transport and exit.
        *self.outbound.write().unwrap_or_else(PoisonError::into_inner) = None;
        if let Some(handle) = worker_slot.take() {
            if let Err(e) = handle.await {
                error!(target: "session::client", error = %e, "connection worker panicked");
            }
            info!(target: "session::client", "disconnected from session");
        }

        *self.hello.write().unwrap_or_else(PoisonError::into_inner) = None;
        self.set_state(ConnectionState::Disconnected);
    }

    fn report_location_checked(&self, locations: Vec<LocationId>) -> Result<(), ClientError> {
        self.send_outbound(Outbound::LocationChecks(locations))
    }

    fn report_goal_completed(&self, goal: Goal) -> Result<(), ClientError> {
        self.send_outbound(Outbound::GoalReached(goal))
    }

    fn sync_checked_locations(&self, locations: Vec<LocationId>) -> Result<(), ClientError> {
        if locations.is_empty() {
            return Ok(());
        }
        self.send_outbound(Outbound::LocationChecks(locations))
    }

    fn set_grant_callback(&self, callback: GrantCallback) {
        *self.callback.write().unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    fn connection_state(&self) -> ConnectionState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn session_hello(&self) -> Option<SessionHello> {
        self.hello
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use crate::types::NetworkGrant;
    use randolink_core::{ItemGrant, ItemId, MemoryItemCounter, PlayerSlot};
    use std::sync::Mutex;
    use std::time::Duration;

    fn accepting_transport() -> Arc<MockTransport> {
        let transport = Arc::new(MockTransport::new());
        transport.push_server_packet(ServerPacket::Connected {
            slot: PlayerSlot::new("Player1"),
            checked_locations: vec![LocationId(10)],
            placements: vec![(LocationId(10), ItemId(1)), (LocationId(11), ItemId(2))],
        });
        transport
    }

    fn options() -> SessionOptions {
        SessionOptions::new("localhost:38281", "Player1")
    }

    /// Polls until `predicate` holds or the deadline passes.
    async fn wait_until(predicate: impl Fn() -> bool) {
        for _ in 0..100 {
            if predicate() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test]
    async fn connect_performs_handshake() {
        let transport = accepting_transport();
        let counter = Arc::new(MemoryItemCounter::new());
        let client = MultiworldClient::new(transport.clone(), counter);

        let hello = client.connect(&options()).await.unwrap();
        assert_eq!(hello.slot, PlayerSlot::new("Player1"));
        assert_eq!(hello.checked_locations, vec![LocationId(10)]);
        assert_eq!(hello.placements.get(&LocationId(11)), Some(&ItemId(2)));
        assert!(client.connection_state().is_connected());
        assert_eq!(client.session_hello(), Some(hello));

        let sent = transport.sent();
        assert_eq!(
            sent[0],
            ClientPacket::Connect(ConnectRequest {
                slot_name: "Player1".into(),
                password: None,
                death_link: false,
            })
        );

        client.disconnect().await;
        assert_eq!(client.connection_state(), ConnectionState::Disconnected);
        assert_eq!(client.session_hello(), None);
    }

    #[tokio::test]
    async fn refused_handshake_reports_reason() {
        let transport = Arc::new(MockTransport::new());
        transport.push_server_packet(ServerPacket::ConnectionRefused {
            reason: "invalid slot name".into(),
        });
        let client = MultiworldClient::new(transport, Arc::new(MemoryItemCounter::new()));

        let result = client.connect(&options()).await;
        assert!(matches!(result, Err(ClientError::Refused(reason)) if reason == "invalid slot name"));
        assert_eq!(client.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn second_connect_is_rejected() {
        let transport = accepting_transport();
        let client = MultiworldClient::new(transport, Arc::new(MemoryItemCounter::new()));

        client.connect(&options()).await.unwrap();
        assert!(matches!(
            client.connect(&options()).await,
            Err(ClientError::AlreadyConnected)
        ));

        client.disconnect().await;
    }

    #[tokio::test]
    async fn reports_reach_the_transport_in_order() {
        let transport = accepting_transport();
        let client = MultiworldClient::new(transport.clone(), Arc::new(MemoryItemCounter::new()));
        client.connect(&options()).await.unwrap();

        client
            .report_location_checked(vec![LocationId(5), LocationId(6)])
            .unwrap();
        client.report_goal_completed(Goal::Completion).unwrap();

        let probe = transport.clone();
        wait_until(move || probe.sent().len() >= 3).await;

        let sent = transport.sent();
        assert_eq!(
            sent[1],
            ClientPacket::LocationChecks {
                locations: vec![LocationId(5), LocationId(6)]
            }
        );
        assert_eq!(
            sent[2],
            ClientPacket::StatusUpdate {
                goal: Goal::Completion
            }
        );

        client.disconnect().await;
    }

    #[tokio::test]
    async fn report_without_session_fails() {
        let transport = Arc::new(MockTransport::new());
        let client = MultiworldClient::new(transport, Arc::new(MemoryItemCounter::new()));

        assert!(matches!(
            client.report_location_checked(vec![LocationId(1)]),
            Err(ClientError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn grants_surface_with_copy_numbers() {
        let transport = accepting_transport();
        let client = MultiworldClient::new(transport.clone(), Arc::new(MemoryItemCounter::new()));

        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        client.set_grant_callback(Arc::new(move |grant: ItemGrant| {
            sink.lock().unwrap().push(grant);
        }));

        client.connect(&options()).await.unwrap();
        transport.push_server_packet(ServerPacket::ItemsPushed {
            grants: vec![
                NetworkGrant {
                    index: 0,
                    item: ItemId(7),
                    recipient: PlayerSlot::new("Player1"),
                },
                NetworkGrant {
                    index: 1,
                    item: ItemId(7),
                    recipient: PlayerSlot::new("Player1"),
                },
                NetworkGrant {
                    index: 2,
                    item: ItemId(9),
                    recipient: PlayerSlot::new("Player1"),
                },
            ],
        });

        let probe = received.clone();
        wait_until(move || probe.lock().unwrap().len() >= 3).await;

        let received = received.lock().unwrap();
        assert_eq!(received[0], ItemGrant::new(ItemId(7), "Player1", 1));
        assert_eq!(received[1], ItemGrant::new(ItemId(7), "Player1", 2));
        assert_eq!(received[2], ItemGrant::new(ItemId(9), "Player1", 1));

        client.disconnect().await;
    }

    #[tokio::test]
    async fn duplicate_push_is_delivered_once() {
        let transport = accepting_transport();
        let client = MultiworldClient::new(transport.clone(), Arc::new(MemoryItemCounter::new()));

        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        client.set_grant_callback(Arc::new(move |grant: ItemGrant| {
            sink.lock().unwrap().push(grant);
        }));

        client.connect(&options()).await.unwrap();
        let push = ServerPacket::ItemsPushed {
            grants: vec![NetworkGrant {
                index: 0,
                item: ItemId(7),
                recipient: PlayerSlot::new("Player1"),
            }],
        };
        transport.push_server_packet(push.clone());
        transport.push_server_packet(push);
        transport.push_server_packet(ServerPacket::ItemsPushed {
            grants: vec![NetworkGrant {
                index: 1,
                item: ItemId(8),
                recipient: PlayerSlot::new("Player1"),
            }],
        });

        let probe = received.clone();
        wait_until(move || probe.lock().unwrap().len() >= 2).await;

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 2);
        assert_eq!(received[0], ItemGrant::new(ItemId(7), "Player1", 1));
        assert_eq!(received[1], ItemGrant::new(ItemId(8), "Player1", 1));

        client.disconnect().await;
    }

    #[tokio::test]
    async fn foreign_grants_do_not_consume_copy_numbers() {
        let transport = accepting_transport();
        let client = MultiworldClient::new(transport.clone(), Arc::new(MemoryItemCounter::new()));

        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        client.set_grant_callback(Arc::new(move |grant: ItemGrant| {
            sink.lock().unwrap().push(grant);
        }));

        client.connect(&options()).await.unwrap();
        transport.push_server_packet(ServerPacket::ItemsPushed {
            grants: vec![
                NetworkGrant {
                    index: 0,
                    item: ItemId(7),
                    recipient: PlayerSlot::new("Someone else"),
                },
                NetworkGrant {
                    index: 1,
                    item: ItemId(7),
                    recipient: PlayerSlot::new("Player1"),
                },
            ],
        });

        let probe = received.clone();
        wait_until(move || probe.lock().unwrap().len() >= 1).await;

        let received = received.lock().unwrap();
        assert_eq!(*received, vec![ItemGrant::new(ItemId(7), "Player1", 1)]);

        client.disconnect().await;
    }

    #[tokio::test]
    async fn replayed_grants_skip_already_applied_copies() {
        let transport = accepting_transport();
        let counter = Arc::new(MemoryItemCounter::new());
        // One copy of item 7 was applied before the reload.
        counter.increment(ItemId(7));

        let client = MultiworldClient::new(transport.clone(), counter);
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        client.set_grant_callback(Arc::new(move |grant: ItemGrant| {
            sink.lock().unwrap().push(grant);
        }));

        client.connect(&options()).await.unwrap();
        transport.push_server_packet(ServerPacket::ItemsPushed {
            grants: vec![
                NetworkGrant {
                    index: 0,
                    item: ItemId(7),
                    recipient: PlayerSlot::new("Player1"),
                },
                NetworkGrant {
                    index: 1,
                    item: ItemId(7),
                    recipient: PlayerSlot::new("Player1"),
                },
            ],
        });

        let probe = received.clone();
        wait_until(move || probe.lock().unwrap().len() >= 1).await;

        let received = received.lock().unwrap();
        assert_eq!(*received, vec![ItemGrant::new(ItemId(7), "Player1", 2)]);

        client.disconnect().await;
    }

    #[tokio::test]
    async fn lost_connection_is_reported() {
        let transport = accepting_transport();
        let client = MultiworldClient::new(transport.clone(), Arc::new(MemoryItemCounter::new()));
        client.connect(&options()).await.unwrap();

        transport.close_stream();

        let probe = client.state.clone();
        wait_until(move || {
            matches!(
                *probe.read().unwrap(),
                ConnectionState::Lost { .. }
            )
        })
        .await;

        // The worker drops its end of the report queue when it exits.
        wait_until(|| {
            matches!(
                client.report_location_checked(vec![LocationId(1)]),
                Err(ClientError::NotConnected)
            )
        })
        .await;
    }
}
