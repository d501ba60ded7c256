//! In-memory envelope store.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use crate::message::Envelope;
use crate::store::{EnvelopeStore, Result, StoreError, StoreSnapshot};

/// In-memory envelope store for tests and offline play.
///
/// Thread-safe but not persistent across process restarts; persistence across
/// save/load comes from embedding its snapshot in the save game.
pub struct MemoryEnvelopeStore {
    inner: Mutex<MemoryStoreState>,
    capacity: Option<usize>,
}

#[derive(Default)]
struct MemoryStoreState {
    next_seq: u64,
    pending: BTreeMap<u64, Envelope>,
}

impl MemoryEnvelopeStore {
    /// Creates an unbounded store.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MemoryStoreState::default()),
            capacity: None,
        }
    }

    /// Creates a store that rejects enqueues past `capacity` pending envelopes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(MemoryStoreState::default()),
            capacity: Some(capacity),
        }
    }
}

impl Default for MemoryEnvelopeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvelopeStore for MemoryEnvelopeStore {
    fn enqueue(&self, envelope: Envelope) -> Result<u64> {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(capacity) = self.capacity
            && state.pending.len() >= capacity
        {
            return Err(StoreError::Full { capacity });
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        state.pending.insert(seq, envelope);
        Ok(seq)
    }

    fn pending(&self) -> Result<Vec<(u64, Envelope)>> {
        let state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(state
            .pending
            .iter()
            .map(|(seq, envelope)| (*seq, envelope.clone()))
            .collect())
    }

    fn acknowledge(&self, seq: u64) -> Result<()> {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .pending
            .remove(&seq)
            .map(|_| ())
            .ok_or(StoreError::UnknownSeq(seq))
    }

    fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .len()
    }

    fn snapshot(&self) -> Result<StoreSnapshot> {
        let state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(StoreSnapshot {
            next_seq: state.next_seq,
            pending: state
                .pending
                .iter()
                .map(|(seq, envelope)| (*seq, envelope.clone()))
                .collect(),
        })
    }

    fn restore(&self, snapshot: StoreSnapshot) -> Result<()> {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        // Never reuse sequence numbers, even when restoring an older snapshot.
        state.next_seq = state.next_seq.max(snapshot.next_seq);
        state.pending = snapshot.pending.into_iter().collect();
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageKind;

    fn envelope(byte: u8) -> Envelope {
        Envelope {
            kind: MessageKind::CheckedLocation,
            payload: vec![byte],
        }
    }

    #[test]
    fn enqueue_assigns_increasing_seqs() {
        let store = MemoryEnvelopeStore::new();
        assert_eq!(store.enqueue(envelope(1)).unwrap(), 0);
        assert_eq!(store.enqueue(envelope(2)).unwrap(), 1);
        assert_eq!(store.enqueue(envelope(3)).unwrap(), 2);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn pending_preserves_enqueue_order() {
        let store = MemoryEnvelopeStore::new();
        for byte in 1..=3 {
            store.enqueue(envelope(byte)).unwrap();
        }

        let payloads: Vec<u8> = store
            .pending()
            .unwrap()
            .into_iter()
            .map(|(_, e)| e.payload[0])
            .collect();
        assert_eq!(payloads, vec![1, 2, 3]);
    }

    #[test]
    fn acknowledge_removes_exactly_one() {
        let store = MemoryEnvelopeStore::new();
        let first = store.enqueue(envelope(1)).unwrap();
        let second = store.enqueue(envelope(2)).unwrap();

        store.acknowledge(first).unwrap();
        assert_eq!(store.len(), 1);
        assert!(matches!(
            store.acknowledge(first),
            Err(StoreError::UnknownSeq(_))
        ));

        store.acknowledge(second).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn capacity_limit_is_reported() {
        let store = MemoryEnvelopeStore::with_capacity(2);
        store.enqueue(envelope(1)).unwrap();
        store.enqueue(envelope(2)).unwrap();

        assert!(matches!(
            store.enqueue(envelope(3)),
            Err(StoreError::Full { capacity: 2 })
        ));

        // Draining frees room again.
        store.acknowledge(0).unwrap();
        store.enqueue(envelope(3)).unwrap();
    }

    #[test]
    fn restore_keeps_seq_monotonic() {
        let store = MemoryEnvelopeStore::new();
        store.enqueue(envelope(1)).unwrap();
        let snapshot = store.snapshot().unwrap();

        store.enqueue(envelope(2)).unwrap();
        store.enqueue(envelope(3)).unwrap();

        store.restore(snapshot).unwrap();
        assert_eq!(store.len(), 1);

        // next_seq stayed at 3 even though the snapshot said 1.
        assert_eq!(store.enqueue(envelope(4)).unwrap(), 3);
    }
}
