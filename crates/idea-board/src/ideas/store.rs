use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;

use super::domain::{Document, IdeaId};

/// Collections of the hosted document store. Every idea lives in `Input` once
/// submitted and is mirrored into `Output` when enrichment has scored it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Input,
    Output,
}

impl Collection {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Input => "ideas_input",
            Self::Output => "ideas_output",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A document together with its store-assigned identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: IdeaId,
    pub fields: Document,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteKind {
    /// Fails with `Conflict` when the document already exists.
    Create(Document),
    /// Create or fully replace the document.
    Put(Document),
    /// Atomic server-side counter update; a missing field counts as zero.
    Increment { field: String, by: i64 },
    Set { field: String, value: Value },
    /// Writes nothing; fails with `Stale` unless the document still holds
    /// exactly these fields.
    Unchanged(Document),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WriteOp {
    pub collection: Collection,
    pub id: IdeaId,
    pub kind: WriteKind,
}

impl WriteOp {
    pub fn create(collection: Collection, id: IdeaId, document: Document) -> Self {
        Self {
            collection,
            id,
            kind: WriteKind::Create(document),
        }
    }

    pub fn put(collection: Collection, id: IdeaId, document: Document) -> Self {
        Self {
            collection,
            id,
            kind: WriteKind::Put(document),
        }
    }

    pub fn increment(collection: Collection, id: IdeaId, field: &str, by: i64) -> Self {
        Self {
            collection,
            id,
            kind: WriteKind::Increment {
                field: field.to_string(),
                by,
            },
        }
    }

    pub fn set(collection: Collection, id: IdeaId, field: &str, value: Value) -> Self {
        Self {
            collection,
            id,
            kind: WriteKind::Set {
                field: field.to_string(),
                value,
            },
        }
    }

    /// Guard that keeps the batch from committing over a newer document.
    pub fn unchanged(collection: Collection, id: IdeaId, document: Document) -> Self {
        Self {
            collection,
            id,
            kind: WriteKind::Unchanged(document),
        }
    }

    /// The write that undoes this one, when one exists.
    pub fn inverse(&self) -> Option<Self> {
        match &self.kind {
            WriteKind::Increment { field, by } => Some(Self::increment(
                self.collection,
                self.id.clone(),
                field,
                -by,
            )),
            _ => None,
        }
    }
}

/// Ordered set of writes committed all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: WriteOp) {
        self.ops.push(op);
    }

    pub fn with(mut self, op: WriteOp) -> Self {
        self.ops.push(op);
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl From<Vec<WriteOp>> for WriteBatch {
    fn from(ops: Vec<WriteOp>) -> Self {
        Self { ops }
    }
}

/// Push-delivered state of a subscribed collection. Every snapshot is complete.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotEvent {
    Snapshot(Vec<StoredDocument>),
    Failed(StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("document {id} not found in {collection}")]
    NotFound { collection: Collection, id: IdeaId },
    #[error("document {id} already exists in {collection}")]
    Conflict { collection: Collection, id: IdeaId },
    #[error("document {id} in {collection} changed since it was read")]
    Stale { collection: Collection, id: IdeaId },
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("write rejected: {0}")]
    Rejected(String),
}

/// Port onto the hosted document database.
pub trait IdeaStore: Send + Sync {
    /// Reserve a fresh document id in the collection without writing anything.
    fn allocate_id(&self, collection: Collection) -> IdeaId;
    fn fetch(
        &self,
        collection: Collection,
        id: &IdeaId,
    ) -> Result<Option<StoredDocument>, StoreError>;
    fn list(&self, collection: Collection) -> Result<Vec<StoredDocument>, StoreError>;
    fn apply(&self, op: WriteOp) -> Result<(), StoreError>;
    /// Apply every write or none of them.
    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;
    /// Stores lacking a transaction primitive return `false`; callers then fall
    /// back to sequential writes.
    fn supports_atomic_batches(&self) -> bool {
        true
    }
    fn subscribe(&self, collection: Collection)
        -> Result<watch::Receiver<SnapshotEvent>, StoreError>;
}

/// Document map for one collection with the store's write semantics. Shared by
/// in-memory store implementations.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSet {
    collection: Collection,
    documents: BTreeMap<IdeaId, Document>,
}

impl DocumentSet {
    pub fn new(collection: Collection) -> Self {
        Self {
            collection,
            documents: BTreeMap::new(),
        }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub fn get(&self, id: &IdeaId) -> Option<StoredDocument> {
        self.documents.get(id).map(|fields| StoredDocument {
            id: id.clone(),
            fields: fields.clone(),
        })
    }

    pub fn contains(&self, id: &IdeaId) -> bool {
        self.documents.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn snapshot(&self) -> Vec<StoredDocument> {
        self.documents
            .iter()
            .map(|(id, fields)| StoredDocument {
                id: id.clone(),
                fields: fields.clone(),
            })
            .collect()
    }

    pub fn apply(&mut self, id: &IdeaId, kind: &WriteKind) -> Result<(), StoreError> {
        let collection = self.collection;
        match kind {
            WriteKind::Create(document) => {
                if self.documents.contains_key(id) {
                    return Err(StoreError::Conflict {
                        collection,
                        id: id.clone(),
                    });
                }
                self.documents.insert(id.clone(), document.clone());
            }
            WriteKind::Put(document) => {
                self.documents.insert(id.clone(), document.clone());
            }
            WriteKind::Increment { field, by } => {
                let document = self.existing(collection, id)?;
                let current = match document.get(field) {
                    None | Some(Value::Null) => 0,
                    Some(value) => value.as_i64().ok_or_else(|| {
                        StoreError::Rejected(format!("field `{field}` of {id} is not an integer"))
                    })?,
                };
                let next = current.checked_add(*by).ok_or_else(|| {
                    StoreError::Rejected(format!("field `{field}` of {id} would overflow"))
                })?;
                document.insert(field.clone(), Value::from(next));
            }
            WriteKind::Set { field, value } => {
                let document = self.existing(collection, id)?;
                document.insert(field.clone(), value.clone());
            }
            WriteKind::Unchanged(expected) => {
                if self.documents.get(id) != Some(expected) {
                    return Err(StoreError::Stale {
                        collection,
                        id: id.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn existing(
        &mut self,
        collection: Collection,
        id: &IdeaId,
    ) -> Result<&mut Document, StoreError> {
        self.documents
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound {
                collection,
                id: id.clone(),
            })
    }
}
