use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;
use tokio::sync::watch;

use crate::ideas::domain::{Document, IdeaId};
use crate::ideas::store::{
    Collection, DocumentSet, IdeaStore, SnapshotEvent, StoreError, StoredDocument, WriteBatch,
    WriteOp,
};
use crate::ideas::{idea_router, BoardHandle, IdeaBoardService, SharedBoardState};

/// Calls that reached the store, in order.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum StoreCall {
    Apply(WriteOp),
    Commit(WriteBatch),
}

#[derive(Debug)]
struct Collections {
    input: DocumentSet,
    output: DocumentSet,
}

impl Collections {
    fn get_mut(&mut self, collection: Collection) -> &mut DocumentSet {
        match collection {
            Collection::Input => &mut self.input,
            Collection::Output => &mut self.output,
        }
    }

    fn get(&self, collection: Collection) -> &DocumentSet {
        match collection {
            Collection::Input => &self.input,
            Collection::Output => &self.output,
        }
    }
}

/// In-memory store recording every write call.
#[derive(Clone)]
pub(super) struct MemoryStore {
    collections: Arc<Mutex<Collections>>,
    calls: Arc<Mutex<Vec<StoreCall>>>,
    next_id: Arc<Mutex<u64>>,
    atomic: bool,
    failing: Option<Collection>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            collections: Arc::new(Mutex::new(Collections {
                input: DocumentSet::new(Collection::Input),
                output: DocumentSet::new(Collection::Output),
            })),
            calls: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(Mutex::new(0)),
            atomic: true,
            failing: None,
        }
    }
}

impl MemoryStore {
    /// Store without a batch primitive whose writes to `failing` are refused.
    pub(super) fn non_atomic_failing(failing: Collection) -> Self {
        Self {
            atomic: false,
            failing: Some(failing),
            ..Self::default()
        }
    }

    pub(super) fn seed(&self, collection: Collection, id: &str, fields: Value) {
        let Value::Object(document) = fields else {
            panic!("seed documents must be objects");
        };
        self.collections
            .lock()
            .expect("store mutex poisoned")
            .get_mut(collection)
            .apply(
                &IdeaId::from(id),
                &crate::ideas::store::WriteKind::Put(document),
            )
            .expect("seed succeeds");
    }

    pub(super) fn document(&self, collection: Collection, id: &str) -> Option<Document> {
        self.collections
            .lock()
            .expect("store mutex poisoned")
            .get(collection)
            .get(&IdeaId::from(id))
            .map(|stored| stored.fields)
    }

    pub(super) fn field(&self, collection: Collection, id: &str, field: &str) -> Option<Value> {
        self.document(collection, id)
            .and_then(|document| document.get(field).cloned())
    }

    pub(super) fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }

    fn record(&self, call: StoreCall) {
        self.calls.lock().expect("calls mutex poisoned").push(call);
    }
}

impl IdeaStore for MemoryStore {
    fn allocate_id(&self, _collection: Collection) -> IdeaId {
        let mut next = self.next_id.lock().expect("id mutex poisoned");
        *next += 1;
        let sequence = *next;
        IdeaId(format!("idea-{sequence:03}"))
    }

    fn fetch(
        &self,
        collection: Collection,
        id: &IdeaId,
    ) -> Result<Option<StoredDocument>, StoreError> {
        Ok(self
            .collections
            .lock()
            .expect("store mutex poisoned")
            .get(collection)
            .get(id))
    }

    fn list(&self, collection: Collection) -> Result<Vec<StoredDocument>, StoreError> {
        Ok(self
            .collections
            .lock()
            .expect("store mutex poisoned")
            .get(collection)
            .snapshot())
    }

    fn apply(&self, op: WriteOp) -> Result<(), StoreError> {
        self.record(StoreCall::Apply(op.clone()));
        if self.failing == Some(op.collection) {
            return Err(StoreError::Unavailable(format!(
                "{} is read-only",
                op.collection
            )));
        }
        self.collections
            .lock()
            .expect("store mutex poisoned")
            .get_mut(op.collection)
            .apply(&op.id, &op.kind)
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        self.record(StoreCall::Commit(batch.clone()));
        let mut guard = self.collections.lock().expect("store mutex poisoned");
        let mut input = guard.input.clone();
        let mut output = guard.output.clone();
        for op in batch.ops() {
            let target = match op.collection {
                Collection::Input => &mut input,
                Collection::Output => &mut output,
            };
            target.apply(&op.id, &op.kind)?;
        }
        guard.input = input;
        guard.output = output;
        Ok(())
    }

    fn supports_atomic_batches(&self) -> bool {
        self.atomic
    }

    fn subscribe(
        &self,
        collection: Collection,
    ) -> Result<watch::Receiver<SnapshotEvent>, StoreError> {
        let snapshot = self.list(collection)?;
        let (_sender, receiver) = watch::channel(SnapshotEvent::Snapshot(snapshot));
        Ok(receiver)
    }
}

/// Store whose backend cannot be reached.
pub(super) struct UnavailableStore;

impl UnavailableStore {
    fn error() -> StoreError {
        StoreError::Unavailable("connection refused".to_string())
    }
}

impl IdeaStore for UnavailableStore {
    fn allocate_id(&self, _collection: Collection) -> IdeaId {
        IdeaId::from("unreachable")
    }

    fn fetch(
        &self,
        _collection: Collection,
        _id: &IdeaId,
    ) -> Result<Option<StoredDocument>, StoreError> {
        Err(Self::error())
    }

    fn list(&self, _collection: Collection) -> Result<Vec<StoredDocument>, StoreError> {
        Err(Self::error())
    }

    fn apply(&self, _op: WriteOp) -> Result<(), StoreError> {
        Err(Self::error())
    }

    fn commit(&self, _batch: WriteBatch) -> Result<(), StoreError> {
        Err(Self::error())
    }

    fn subscribe(
        &self,
        _collection: Collection,
    ) -> Result<watch::Receiver<SnapshotEvent>, StoreError> {
        Err(Self::error())
    }
}

/// Store where another client's writes land right after each of the next
/// `rounds` reads of an enriched record.
pub(super) struct InterleavingStore {
    inner: MemoryStore,
    concurrent: Vec<WriteOp>,
    rounds: Mutex<usize>,
}

impl InterleavingStore {
    pub(super) fn new(inner: MemoryStore, concurrent: Vec<WriteOp>, rounds: usize) -> Self {
        Self {
            inner,
            concurrent,
            rounds: Mutex::new(rounds),
        }
    }
}

impl IdeaStore for InterleavingStore {
    fn allocate_id(&self, collection: Collection) -> IdeaId {
        self.inner.allocate_id(collection)
    }

    fn fetch(
        &self,
        collection: Collection,
        id: &IdeaId,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let read = self.inner.fetch(collection, id)?;
        if collection == Collection::Output {
            let mut rounds = self.rounds.lock().expect("rounds mutex poisoned");
            if *rounds > 0 {
                *rounds -= 1;
                self.inner
                    .commit(WriteBatch::from(self.concurrent.clone()))?;
            }
        }
        Ok(read)
    }

    fn list(&self, collection: Collection) -> Result<Vec<StoredDocument>, StoreError> {
        self.inner.list(collection)
    }

    fn apply(&self, op: WriteOp) -> Result<(), StoreError> {
        self.inner.apply(op)
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        self.inner.commit(batch)
    }

    fn subscribe(
        &self,
        collection: Collection,
    ) -> Result<watch::Receiver<SnapshotEvent>, StoreError> {
        self.inner.subscribe(collection)
    }
}

/// The vote another client casts on both mirrors.
pub(super) fn concurrent_upvote(id: &str) -> Vec<WriteOp> {
    [Collection::Input, Collection::Output]
        .into_iter()
        .map(|collection| {
            WriteOp::increment(collection, IdeaId::from(id), crate::ideas::domain::fields::VOTES, 1)
        })
        .collect()
}

pub(super) fn scored_idea(title: &str) -> Value {
    serde_json::json!({
        "title": title,
        "category": "AI",
        "description": "Rank results by semantic similarity",
        "votes": 50,
        "roi": 8,
        "effort": 2,
        "risk": 1,
        "alignment": 3,
        "priority": "High",
        "composite_score": 9.75
    })
}

pub(super) fn submitted_idea(title: &str, votes: i64) -> Value {
    serde_json::json!({
        "title": title,
        "category": "AI",
        "description": "Rank results by semantic similarity",
        "votes": votes
    })
}

pub(super) fn build_service() -> (IdeaBoardService<MemoryStore>, MemoryStore) {
    let store = MemoryStore::default();
    let service = IdeaBoardService::new(Arc::new(store.clone()));
    (service, store)
}

pub(super) fn board_router(store: MemoryStore, state: SharedBoardState) -> axum::Router {
    let service = Arc::new(IdeaBoardService::new(Arc::new(store)));
    idea_router(BoardHandle::new(service, state))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 64)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
