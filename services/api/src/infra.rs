use idea_board::ideas::{
    Collection, DocumentSet, IdeaId, IdeaStore, SnapshotEvent, StoreError, StoredDocument,
    WriteBatch, WriteOp,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

struct Collections {
    input: DocumentSet,
    output: DocumentSet,
}

impl Collections {
    fn get(&self, collection: Collection) -> &DocumentSet {
        match collection {
            Collection::Input => &self.input,
            Collection::Output => &self.output,
        }
    }

    fn get_mut(&mut self, collection: Collection) -> &mut DocumentSet {
        match collection {
            Collection::Input => &mut self.input,
            Collection::Output => &mut self.output,
        }
    }
}

/// Process-local document store. Every write broadcasts a fresh snapshot of the
/// touched collection to its subscribers.
#[derive(Clone)]
pub(crate) struct InMemoryIdeaStore {
    collections: Arc<Mutex<Collections>>,
    input_feed: Arc<watch::Sender<SnapshotEvent>>,
    output_feed: Arc<watch::Sender<SnapshotEvent>>,
    next_id: Arc<AtomicU64>,
    available: Arc<AtomicBool>,
}

impl Default for InMemoryIdeaStore {
    fn default() -> Self {
        let (input_feed, _) = watch::channel(SnapshotEvent::Snapshot(Vec::new()));
        let (output_feed, _) = watch::channel(SnapshotEvent::Snapshot(Vec::new()));
        Self {
            collections: Arc::new(Mutex::new(Collections {
                input: DocumentSet::new(Collection::Input),
                output: DocumentSet::new(Collection::Output),
            })),
            input_feed: Arc::new(input_feed),
            output_feed: Arc::new(output_feed),
            next_id: Arc::new(AtomicU64::new(0)),
            available: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl InMemoryIdeaStore {
    /// Simulate losing the backend. Subscribers receive a failure event and
    /// every call errors until the store is available again.
    pub(crate) fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
        if available {
            let guard = self.collections.lock().expect("store mutex poisoned");
            self.broadcast(&guard, Collection::Input);
            self.broadcast(&guard, Collection::Output);
        } else {
            for feed in [&self.input_feed, &self.output_feed] {
                feed.send_replace(SnapshotEvent::Failed(Self::outage()));
            }
        }
    }

    fn outage() -> StoreError {
        StoreError::Unavailable("in-memory store is offline".to_string())
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(Self::outage())
        }
    }

    fn feed(&self, collection: Collection) -> &watch::Sender<SnapshotEvent> {
        match collection {
            Collection::Input => &self.input_feed,
            Collection::Output => &self.output_feed,
        }
    }

    fn broadcast(&self, collections: &Collections, collection: Collection) {
        self.feed(collection)
            .send_replace(SnapshotEvent::Snapshot(collections.get(collection).snapshot()));
    }
}

impl IdeaStore for InMemoryIdeaStore {
    fn allocate_id(&self, _collection: Collection) -> IdeaId {
        let sequence = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        IdeaId(format!("idea-{sequence:06}"))
    }

    fn fetch(
        &self,
        collection: Collection,
        id: &IdeaId,
    ) -> Result<Option<StoredDocument>, StoreError> {
        self.ensure_available()?;
        let guard = self.collections.lock().expect("store mutex poisoned");
        Ok(guard.get(collection).get(id))
    }

    fn list(&self, collection: Collection) -> Result<Vec<StoredDocument>, StoreError> {
        self.ensure_available()?;
        let guard = self.collections.lock().expect("store mutex poisoned");
        Ok(guard.get(collection).snapshot())
    }

    fn apply(&self, op: WriteOp) -> Result<(), StoreError> {
        self.ensure_available()?;
        let mut guard = self.collections.lock().expect("store mutex poisoned");
        guard.get_mut(op.collection).apply(&op.id, &op.kind)?;
        self.broadcast(&guard, op.collection);
        Ok(())
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        self.ensure_available()?;
        let mut guard = self.collections.lock().expect("store mutex poisoned");
        let mut input = guard.input.clone();
        let mut output = guard.output.clone();
        let mut touched_input = false;
        let mut touched_output = false;
        for op in batch.ops() {
            match op.collection {
                Collection::Input => {
                    input.apply(&op.id, &op.kind)?;
                    touched_input = true;
                }
                Collection::Output => {
                    output.apply(&op.id, &op.kind)?;
                    touched_output = true;
                }
            }
        }
        guard.input = input;
        guard.output = output;
        if touched_input {
            self.broadcast(&guard, Collection::Input);
        }
        if touched_output {
            self.broadcast(&guard, Collection::Output);
        }
        Ok(())
    }

    fn subscribe(
        &self,
        collection: Collection,
    ) -> Result<watch::Receiver<SnapshotEvent>, StoreError> {
        self.ensure_available()?;
        let guard = self.collections.lock().expect("store mutex poisoned");
        self.broadcast(&guard, collection);
        Ok(self.feed(collection).subscribe())
    }
}
