//! File-backed envelope store.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::message::Envelope;
use crate::store::{EnvelopeStore, Result, StoreError, StoreSnapshot};

const WRITE_BUFFER_SIZE: usize = 8 * 1024 * 1024; // 8MB buffer

/// One record in the journal file.
#[derive(Debug, Serialize, Deserialize)]
enum JournalRecord {
    /// Sequence counter floor, written at the head of a rewritten journal.
    Meta { next_seq: u64 },
    Enqueued { seq: u64, envelope: Envelope },
    Acked { seq: u64 },
}

/// Envelope store backed by an append-only journal.
///
/// Records are stored as:
/// ```text
/// [u32 length][bincode serialized JournalRecord]
/// [u32 length][bincode serialized JournalRecord]
/// ...
/// ```
///
/// Every enqueue and acknowledgement is appended and flushed before the call
/// returns. On open the journal is replayed to rebuild the pending set; a
/// truncated or undecodable tail (crash mid-write) is cut off with a warning.
pub struct FileEnvelopeStore {
    inner: Mutex<FileStoreState>,
}

struct FileStoreState {
    path: PathBuf,
    writer: BufWriter<File>,
    next_seq: u64,
    pending: BTreeMap<u64, Envelope>,
}

impl FileEnvelopeStore {
    /// Opens a journal, creating directory and file as needed.
    pub fn open_or_create(base_dir: impl AsRef<Path>, filename: impl AsRef<str>) -> Result<Self> {
        let base_dir = base_dir.as_ref();
        std::fs::create_dir_all(base_dir)?;

        let path = base_dir.join(filename.as_ref());
        let (next_seq, pending, valid_len) = replay(&path)?;

        let file_len = match std::fs::metadata(&path) {
            Ok(meta) => meta.len(),
            Err(_) => 0,
        };
        if valid_len < file_len {
            tracing::warn!(
                target: "bus::store",
                path = %path.display(),
                valid_len,
                file_len,
                "journal has a damaged tail, truncating"
            );
            let file = OpenOptions::new().write(true).open(&path)?;
            file.set_len(valid_len)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);

        tracing::debug!(
            target: "bus::store",
            path = %path.display(),
            pending = pending.len(),
            next_seq,
            "opened envelope journal"
        );

        Ok(Self {
            inner: Mutex::new(FileStoreState {
                path,
                writer,
                next_seq,
                pending,
            }),
        })
    }

    /// Full path of the journal file.
    pub fn path(&self) -> PathBuf {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .path
            .clone()
    }
}

impl EnvelopeStore for FileEnvelopeStore {
    fn enqueue(&self, envelope: Envelope) -> Result<u64> {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let seq = state.next_seq;
        write_record(
            &mut state.writer,
            &JournalRecord::Enqueued {
                seq,
                envelope: envelope.clone(),
            },
        )?;
        state.writer.flush()?;
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
        if !state.pending.contains_key(&seq) {
            return Err(StoreError::UnknownSeq(seq));
        }
        write_record(&mut state.writer, &JournalRecord::Acked { seq })?;
        state.writer.flush()?;
        state.pending.remove(&seq);
        Ok(())
    }

    fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .len()
    }

    fn compact(&self) -> Result<()> {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let next_seq = state.next_seq;
        let pending = state.pending.clone();
        rewrite_journal(&mut state, next_seq, pending)
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
        let next_seq = state.next_seq.max(snapshot.next_seq);
        let pending: BTreeMap<u64, Envelope> = snapshot.pending.into_iter().collect();
        rewrite_journal(&mut state, next_seq, pending)
    }
}

impl Drop for FileEnvelopeStore {
    fn drop(&mut self) {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = state.writer.flush() {
            tracing::warn!(
                target: "bus::store",
                path = %state.path.display(),
                error = %e,
                "failed to flush envelope journal on drop"
            );
        }
    }
}

/// Replays a journal file, returning the rebuilt state and the byte length of
/// the valid prefix.
fn replay(path: &Path) -> Result<(u64, BTreeMap<u64, Envelope>, u64)> {
    let mut next_seq = 0u64;
    let mut pending = BTreeMap::new();

    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((0, pending, 0)),
        Err(e) => return Err(StoreError::Io(e)),
    };
    let file_len = file.metadata()?.len();
    let mut reader = BufReader::new(file);
    let mut offset = 0u64;

    while offset + 4 <= file_len {
        let mut len_bytes = [0u8; 4];
        reader.read_exact(&mut len_bytes)?;
        let len = u32::from_le_bytes(len_bytes) as u64;

        if offset + 4 + len > file_len {
            // Crash mid-write left a short record; everything before it is good.
            break;
        }

        let mut data = vec![0u8; len as usize];
        reader.read_exact(&mut data)?;

        let record: JournalRecord = match bincode::deserialize(&data) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(
                    target: "bus::store",
                    path = %path.display(),
                    offset,
                    error = %e,
                    "undecodable journal record, treating as damaged tail"
                );
                break;
            }
        };

        match record {
            JournalRecord::Meta { next_seq: floor } => {
                next_seq = next_seq.max(floor);
            }
            JournalRecord::Enqueued { seq, envelope } => {
                next_seq = next_seq.max(seq + 1);
                pending.insert(seq, envelope);
            }
            JournalRecord::Acked { seq } => {
                pending.remove(&seq);
            }
        }

        offset += 4 + len;
    }

    Ok((next_seq, pending, offset))
}

fn write_record(writer: &mut BufWriter<File>, record: &JournalRecord) -> Result<()> {
    let bytes =
        bincode::serialize(record).map_err(|e| StoreError::Serialization(e.to_string()))?;
    let len = bytes.len() as u32;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&bytes)?;
    Ok(())
}

/// Rewrites the journal to a `Meta` record plus the given pending set, then
/// swaps it in atomically and reopens the writer.
fn rewrite_journal(
    state: &mut FileStoreState,
    next_seq: u64,
    pending: BTreeMap<u64, Envelope>,
) -> Result<()> {
    state.writer.flush()?;

    let tmp_path = state.path.with_extension("journal.tmp");
    {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);
        write_record(&mut writer, &JournalRecord::Meta { next_seq })?;
        for (seq, envelope) in &pending {
            write_record(
                &mut writer,
                &JournalRecord::Enqueued {
                    seq: *seq,
                    envelope: envelope.clone(),
                },
            )?;
        }
        writer.flush()?;
    }
    std::fs::rename(&tmp_path, &state.path)?;

    let file = OpenOptions::new().append(true).open(&state.path)?;
    state.writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);
    state.next_seq = next_seq;
    state.pending = pending;

    tracing::debug!(
        target: "bus::store",
        path = %state.path.display(),
        pending = state.pending.len(),
        next_seq,
        "rewrote envelope journal"
    );

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageKind;
    use tempfile::TempDir;

    fn envelope(byte: u8) -> Envelope {
        Envelope {
            kind: MessageKind::CheckedLocation,
            payload: vec![byte],
        }
    }

    #[test]
    fn enqueued_envelopes_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();

        {
            let store =
                FileEnvelopeStore::open_or_create(temp_dir.path(), "messages.journal").unwrap();
            assert_eq!(store.enqueue(envelope(1)).unwrap(), 0);
            assert_eq!(store.enqueue(envelope(2)).unwrap(), 1);
        }

        let store = FileEnvelopeStore::open_or_create(temp_dir.path(), "messages.journal").unwrap();
        let pending = store.pending().unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].1.payload, vec![1]);
        assert_eq!(pending[1].1.payload, vec![2]);

        // Sequence numbering continues where the previous run stopped.
        assert_eq!(store.enqueue(envelope(3)).unwrap(), 2);
    }

    #[test]
    fn acknowledgements_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();

        {
            let store =
                FileEnvelopeStore::open_or_create(temp_dir.path(), "messages.journal").unwrap();
            let first = store.enqueue(envelope(1)).unwrap();
            store.enqueue(envelope(2)).unwrap();
            store.acknowledge(first).unwrap();
        }

        let store = FileEnvelopeStore::open_or_create(temp_dir.path(), "messages.journal").unwrap();
        let pending = store.pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].1.payload, vec![2]);
    }

    #[test]
    fn damaged_tail_is_cut_off() {
        let temp_dir = TempDir::new().unwrap();

        {
            let store =
                FileEnvelopeStore::open_or_create(temp_dir.path(), "messages.journal").unwrap();
            store.enqueue(envelope(1)).unwrap();
            store.enqueue(envelope(2)).unwrap();
        }

        // Simulate a crash mid-write: a length prefix promising more bytes
        // than the file holds.
        let path = temp_dir.path().join("messages.journal");
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&100u32.to_le_bytes()).unwrap();
        file.write_all(&[0xAA, 0xBB]).unwrap();
        drop(file);

        let store = FileEnvelopeStore::open_or_create(temp_dir.path(), "messages.journal").unwrap();
        assert_eq!(store.len(), 2);

        // The store keeps working after truncation.
        store.enqueue(envelope(3)).unwrap();
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn compact_drops_acknowledged_history() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileEnvelopeStore::open_or_create(temp_dir.path(), "messages.journal").unwrap();

        for byte in 0..20 {
            store.enqueue(envelope(byte)).unwrap();
        }
        for seq in 0..19 {
            store.acknowledge(seq).unwrap();
        }

        let before = std::fs::metadata(store.path()).unwrap().len();
        store.compact().unwrap();
        let after = std::fs::metadata(store.path()).unwrap().len();
        assert!(after < before);

        // Contents and numbering are unchanged.
        assert_eq!(store.len(), 1);
        assert_eq!(store.enqueue(envelope(99)).unwrap(), 20);

        drop(store);
        let store = FileEnvelopeStore::open_or_create(temp_dir.path(), "messages.journal").unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn restore_is_durable_and_keeps_seq_monotonic() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileEnvelopeStore::open_or_create(temp_dir.path(), "messages.journal").unwrap();

        store.enqueue(envelope(1)).unwrap();
        let snapshot = store.snapshot().unwrap();

        store.enqueue(envelope(2)).unwrap();
        store.enqueue(envelope(3)).unwrap();
        store.restore(snapshot).unwrap();
        assert_eq!(store.len(), 1);

        drop(store);
        let store = FileEnvelopeStore::open_or_create(temp_dir.path(), "messages.journal").unwrap();
        let pending = store.pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].1.payload, vec![1]);

        // next_seq stayed at 3 even though the snapshot said 1.
        assert_eq!(store.enqueue(envelope(4)).unwrap(), 3);
    }
}
