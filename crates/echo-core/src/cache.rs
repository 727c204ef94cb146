//! State cache — in-memory projection of the store, rebuilt by a full
//! re-read after every mutation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use crate::aggregator::EntryAggregator;
use crate::events::JournalEvent;
use crate::ids::EntryId;
use crate::types::EntryRecord;

struct Snapshot {
    generation: u64,
    entries: Arc<Vec<EntryRecord>>,
}

pub struct StateCache {
    aggregator: EntryAggregator,
    snapshot: RwLock<Snapshot>,
    next_generation: AtomicU64,
    event_tx: broadcast::Sender<JournalEvent>,
}

impl StateCache {
    pub fn new(aggregator: EntryAggregator) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            aggregator,
            snapshot: RwLock::new(Snapshot {
                generation: 0,
                entries: Arc::new(Vec::new()),
            }),
            next_generation: AtomicU64::new(1),
            event_tx,
        }
    }

    pub fn aggregator(&self) -> &EntryAggregator {
        &self.aggregator
    }

    /// Re-read the whole store and publish the result.
    ///
    /// Refreshes can overlap. Each takes a generation number before it reads,
    /// and a slower, older read never replaces a newer snapshot.
    pub async fn refresh(&self) -> Arc<Vec<EntryRecord>> {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let entries = Arc::new(self.aggregator.list_entries().await);

        let mut snapshot = self.snapshot.write().await;
        if generation < snapshot.generation {
            debug!(
                "Discarding stale refresh {} (have {})",
                generation, snapshot.generation
            );
            return Arc::clone(&snapshot.entries);
        }
        snapshot.generation = generation;
        snapshot.entries = Arc::clone(&entries);
        drop(snapshot);

        self.broadcast(JournalEvent::Entries(entries.as_ref().clone()));
        entries
    }

    /// The last published snapshot, newest entry first.
    pub async fn entries(&self) -> Arc<Vec<EntryRecord>> {
        Arc::clone(&self.snapshot.read().await.entries)
    }

    pub async fn get(&self, id: EntryId) -> Option<EntryRecord> {
        self.snapshot
            .read()
            .await
            .entries
            .iter()
            .find(|e| e.id == id)
            .cloned()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JournalEvent> {
        self.event_tx.subscribe()
    }

    pub(crate) fn broadcast(&self, event: JournalEvent) {
        let _ = self.event_tx.send(event);
    }
}
