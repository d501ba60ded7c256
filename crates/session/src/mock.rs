//! In-memory transport for tests and offline development.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::Notify;

use randolink_core::SessionOptions;

use crate::traits::{SessionTransport, TransportError};
use crate::types::{ClientPacket, ServerPacket};

#[derive(Default)]
struct MockState {
    sent: Vec<ClientPacket>,
    queue: VecDeque<ServerPacket>,
    connected: bool,
    closed: bool,
    fail_connect: Option<String>,
    connect_calls: u32,
}

/// Scripted [`SessionTransport`].
///
/// The test drives the server side: queue replies with
/// [`push_server_packet`](Self::push_server_packet) and inspect what the
/// client sent with [`sent`](Self::sent).
#[derive(Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
    notify: Notify,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues a packet for the next [`SessionTransport::recv`] call.
    pub fn push_server_packet(&self, packet: ServerPacket) {
        self.lock().queue.push_back(packet);
        self.notify.notify_one();
    }

    /// Simulates the server dropping the connection.
    pub fn close_stream(&self) {
        self.lock().closed = true;
        self.notify.notify_one();
    }

    /// Makes the next connect attempt fail with `reason`.
    pub fn fail_next_connect(&self, reason: impl Into<String>) {
        self.lock().fail_connect = Some(reason.into());
    }

    /// Packets sent by the client so far, in order.
    pub fn sent(&self) -> Vec<ClientPacket> {
        self.lock().sent.clone()
    }

    pub fn connect_calls(&self) -> u32 {
        self.lock().connect_calls
    }

    pub fn is_connected(&self) -> bool {
        let state = self.lock();
        state.connected && !state.closed
    }
}

#[async_trait]
impl SessionTransport for MockTransport {
    async fn connect(&self, _options: &SessionOptions) -> Result<(), TransportError> {
        let mut state = self.lock();
        state.connect_calls += 1;
        if let Some(reason) = state.fail_connect.take() {
            return Err(TransportError::ConnectFailed(reason));
        }
        state.connected = true;
        state.closed = false;
        Ok(())
    }

    async fn send(&self, packet: ClientPacket) -> Result<(), TransportError> {
        let mut state = self.lock();
        if !state.connected || state.closed {
            return Err(TransportError::Closed);
        }
        state.sent.push(packet);
        Ok(())
    }

    async fn recv(&self) -> Result<ServerPacket, TransportError> {
        loop {
            // Register before checking so a push between the check and the
            // await still wakes us.
            let notified = self.notify.notified();
            {
                let mut state = self.lock();
                if let Some(packet) = state.queue.pop_front() {
                    return Ok(packet);
                }
                if !state.connected || state.closed {
                    return Err(TransportError::Closed);
                }
            }
            notified.await;
        }
    }

    async fn close(&self) {
        let mut state = self.lock();
        state.connected = false;
        self.notify.notify_one();
    }
}
