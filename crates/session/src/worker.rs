//! Connection worker task.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use randolink_core::{Goal, ItemCounter, ItemGrant, ItemId, LocationId, PlayerSlot};

use crate::traits::{GrantCallback, SessionTransport};
use crate::types::{ClientPacket, ConnectionState, NetworkGrant, ServerPacket};

/// Outbound traffic queued by the sync report methods.
pub(crate) enum Outbound {
    LocationChecks(Vec<LocationId>),
    GoalReached(Goal),
}

/// Owns the steady-state connection after a successful handshake.
///
/// Runs as one task per session: forwards queued reports to the transport and
/// turns pushed grants into callback invocations. Exits when the outbound
/// channel closes (orderly disconnect) or the transport fails.
pub(crate) struct ConnectionWorker {
    transport: Arc<dyn SessionTransport>,
    outbound: mpsc::Receiver<Outbound>,
    counter: Arc<dyn ItemCounter>,
    callback: Arc<RwLock<Option<GrantCallback>>>,
    state: Arc<RwLock<ConnectionState>>,
    slot: PlayerSlot,
    /// Next expected index in the grant stream.
    cursor: u64,
    /// Grants seen per item this connection, for copy numbering.
    seen: HashMap<ItemId, u32>,
}

impl ConnectionWorker {
    pub(crate) fn new(
        transport: Arc<dyn SessionTransport>,
        outbound: mpsc::Receiver<Outbound>,
        counter: Arc<dyn ItemCounter>,
        callback: Arc<RwLock<Option<GrantCallback>>>,
        state: Arc<RwLock<ConnectionState>>,
        slot: PlayerSlot,
    ) -> Self {
        Self {
            transport,
            outbound,
            counter,
            callback,
            state,
            slot,
            cursor: 0,
            seen: HashMap::new(),
        }
    }

    pub(crate) async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.outbound.recv() => match command {
                    Some(outbound) => {
                        if !self.forward(outbound).await {
                            break;
                        }
                    }
                    None => {
                        // The client dropped the sender: orderly shutdown.
                        self.transport.close().await;
                        break;
                    }
                },
                packet = self.transport.recv() => match packet {
                    Ok(packet) => self.handle_packet(packet),
                    Err(e) => {
                        warn!(target: "session::worker", slot = %self.slot, error = %e, "connection lost");
                        self.set_state(ConnectionState::Lost {
                            reason: e.to_string(),
                        });
                        break;
                    }
                },
            }
        }
        debug!(target: "session::worker", slot = %self.slot, "connection worker stopped");
    }

    /// Sends one queued report. Returns false when the connection is gone.
    async fn forward(&mut self, outbound: Outbound) -> bool {
        let packet = match outbound {
            Outbound::LocationChecks(locations) => ClientPacket::LocationChecks { locations },
            Outbound::GoalReached(goal) => ClientPacket::StatusUpdate { goal },
        };
        match self.transport.send(packet).await {
            Ok(()) => true,
            Err(e) => {
                warn!(target: "session::worker", slot = %self.slot, error = %e, "failed to send report");
                self.set_state(ConnectionState::Lost {
                    reason: e.to_string(),
                });
                false
            }
        }
    }

    fn handle_packet(&mut self, packet: ServerPacket) {
        match packet {
            ServerPacket::ItemsPushed { grants } => {
                for grant in grants {
                    self.handle_grant(grant);
                }
            }
            other => {
                debug!(target: "session::worker", packet = ?other, "ignoring unexpected packet");
            }
        }
    }

    fn handle_grant(&mut self, grant: NetworkGrant) {
        if grant.index < self.cursor {
            trace!(
                target: "session::worker",
                index = grant.index,
                item = %grant.item,
                "duplicate push, skipped"
            );
            return;
        }
        self.cursor = grant.index + 1;

        // Copy numbers are per recipient; grants addressed to someone else
        // must not consume one.
        if grant.recipient != self.slot {
            debug!(
                target: "session::worker",
                item = %grant.item,
                recipient = %grant.recipient,
                "grant addressed to another slot, skipped"
            );
            return;
        }

        let copy = {
            let seen = self.seen.entry(grant.item).or_insert(0);
            *seen += 1;
            *seen
        };

        // Grants applied in an earlier run come back on reconnect; the held
        // count tells them apart from genuinely new copies.
        if self.counter.count_of(grant.item) >= copy {
            debug!(
                target: "session::worker",
                item = %grant.item,
                copy,
                "grant already applied, skipped"
            );
            return;
        }

        let callback = self
            .callback
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match callback {
            Some(callback) => {
                callback(ItemGrant {
                    item: grant.item,
                    recipient: grant.recipient,
                    copy,
                });
            }
            None => {
                warn!(
                    target: "session::worker",
                    item = %grant.item,
                    copy,
                    "no grant callback registered, dropping grant"
                );
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }
}
