//! The persistence gateway: schemaless JSON documents in named collections.
//!
//! Record types decode themselves from [Document]s and encode themselves
//! back to [Fields], so the store itself never needs to know about
//! transactions or categories. Both backends push a fresh [Snapshot] to
//! every affected [Subscription] after each successful write.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryDocumentStore;
pub use sqlite::SQLiteDocumentStore;

use std::{fmt::Display, sync::Mutex};

use serde_json::Value;
use tokio::sync::watch;
use uuid::Uuid;

use crate::{Error, session::UserId};

/// The collection names used on the wire.
pub mod collections {
    /// Ledger entries, both income and expenses.
    pub const TRANSACTIONS: &str = "transactions";
    /// Monthly fixed-expense templates.
    pub const FIXED_EXPENSES: &str = "despesasFixas";
    /// Expense categories, either user-owned or shared.
    pub const EXPENSE_CATEGORIES: &str = "tiposDespesa";
    /// Savings goals.
    pub const SAVINGS_GOALS: &str = "objetivos";
}

/// Sentinel owner ID on records shared with every user.
pub const SHARED_OWNER: &str = "padrao";

/// The schemaless field map of a stored document.
pub type Fields = serde_json::Map<String, Value>;

/// The documents matching a query or subscription, in insertion order.
pub type Snapshot = Vec<Document>;

/// Unique identifier of a document within its collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentId(String);

impl DocumentId {
    /// Generate a fresh random ID.
    ///
    /// IDs are assigned before the write reaches the store so that batched
    /// inserts can hand back their IDs immediately.
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create an ID from an existing identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The underlying identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored document: its ID plus its field map.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// The document's ID within its collection.
    pub id: DocumentId,
    /// The document's fields.
    pub fields: Fields,
}

impl Document {
    /// The value of the named field, if present.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// The owner ID stored in the document's `uid` field.
    pub fn owner(&self) -> Option<&str> {
        self.fields.get("uid").and_then(Value::as_str)
    }
}

/// Which owners' documents a query or subscription covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerScope {
    /// Documents owned by a single user.
    User(UserId),
    /// Documents owned by a single user, plus shared documents owned by
    /// [SHARED_OWNER].
    UserOrShared(UserId),
}

impl OwnerScope {
    /// Whether a document with the given owner falls inside this scope.
    ///
    /// Documents without an owner field never match.
    pub fn matches(&self, owner: Option<&str>) -> bool {
        match self {
            OwnerScope::User(user_id) => owner == Some(user_id.as_str()),
            OwnerScope::UserOrShared(user_id) => {
                owner == Some(user_id.as_str()) || owner == Some(SHARED_OWNER)
            }
        }
    }
}

/// A single operation queued in a [WriteBatch].
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    /// Insert a new document under a pre-assigned ID.
    Insert {
        /// The collection to insert into.
        collection: String,
        /// The new document, ID included.
        document: Document,
    },
    /// Merge fields into an existing document.
    Update {
        /// The collection holding the document.
        collection: String,
        /// The document to update.
        id: DocumentId,
        /// The fields to merge in.
        fields: Fields,
    },
    /// Delete a document.
    Delete {
        /// The collection holding the document.
        collection: String,
        /// The document to delete.
        id: DocumentId,
    },
}

impl BatchOp {
    /// The collection this operation touches.
    pub fn collection(&self) -> &str {
        match self {
            BatchOp::Insert { collection, .. }
            | BatchOp::Update { collection, .. }
            | BatchOp::Delete { collection, .. } => collection,
        }
    }
}

/// An ordered set of writes applied atomically by [DocumentStore::commit].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    operations: Vec<BatchOp>,
}

impl WriteBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an insert, assigning and returning the new document's ID.
    pub fn insert(&mut self, collection: &str, fields: Fields) -> DocumentId {
        let id = DocumentId::random();
        self.operations.push(BatchOp::Insert {
            collection: collection.to_string(),
            document: Document {
                id: id.clone(),
                fields,
            },
        });

        id
    }

    /// Queue a field merge into an existing document.
    pub fn update(&mut self, collection: &str, id: &DocumentId, fields: Fields) {
        self.operations.push(BatchOp::Update {
            collection: collection.to_string(),
            id: id.clone(),
            fields,
        });
    }

    /// Queue a delete.
    pub fn delete(&mut self, collection: &str, id: &DocumentId) {
        self.operations.push(BatchOp::Delete {
            collection: collection.to_string(),
            id: id.clone(),
        });
    }

    /// Whether no operations are queued.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// The number of queued operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Consume the batch, yielding its operations in queue order.
    pub fn into_operations(self) -> Vec<BatchOp> {
        self.operations
    }
}

/// Stores schemaless documents in named collections.
///
/// Writes are owner-agnostic; ownership lives in each document's `uid`
/// field and only [DocumentStore::query] and [DocumentStore::subscribe]
/// filter by it.
pub trait DocumentStore {
    /// Insert a new document and return its assigned ID.
    ///
    /// # Errors
    ///
    /// Returns an [Error::SqlError] or [Error::JSONSerializationError] if
    /// the document could not be written.
    fn insert(&self, collection: &str, fields: Fields) -> Result<DocumentId, Error>;

    /// Merge `fields` into the document with `id`, replacing existing
    /// values field by field and keeping fields the merge does not name.
    ///
    /// # Errors
    ///
    /// Returns [Error::DocumentNotFound] if no document with `id` exists in
    /// `collection`.
    fn update(&self, collection: &str, id: &DocumentId, fields: Fields) -> Result<(), Error>;

    /// Delete the document with `id`.
    ///
    /// Deleting an ID that is already gone succeeds without effect.
    ///
    /// # Errors
    ///
    /// Returns an [Error::SqlError] if the delete could not be executed.
    fn delete(&self, collection: &str, id: &DocumentId) -> Result<(), Error>;

    /// The documents in `collection` within `scope`, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an [Error::SqlError] or [Error::JSONSerializationError] if
    /// the collection could not be read.
    fn query(&self, collection: &str, scope: &OwnerScope) -> Result<Snapshot, Error>;

    /// Open a live view of `collection` within `scope`.
    ///
    /// The subscription starts from the current snapshot and receives a
    /// full replacement snapshot after every write to the collection.
    /// Dropping the subscription cancels delivery.
    ///
    /// # Errors
    ///
    /// Returns an [Error::SqlError] or [Error::JSONSerializationError] if
    /// the initial snapshot could not be read.
    fn subscribe(&self, collection: &str, scope: &OwnerScope) -> Result<Subscription, Error>;

    /// Apply every operation in `batch`, in order, as a single atomic
    /// write. Subscribers observe either none of the batch or all of it.
    ///
    /// # Errors
    ///
    /// Returns [Error::DocumentNotFound] if an update names a missing
    /// document, or an [Error::SqlError] if the write fails. No operation
    /// takes effect in either case.
    fn commit(&self, batch: WriteBatch) -> Result<(), Error>;
}

/// A live view of one collection scoped to an owner.
///
/// Holds the latest full snapshot pushed by the store. Dropping the
/// subscription stops delivery.
#[derive(Debug)]
pub struct Subscription {
    receiver: watch::Receiver<Snapshot>,
}

impl Subscription {
    /// The latest snapshot, marking it as seen.
    pub fn snapshot(&mut self) -> Snapshot {
        self.receiver.borrow_and_update().clone()
    }

    /// Whether a new snapshot arrived since [Subscription::snapshot] was
    /// last called.
    ///
    /// # Errors
    ///
    /// Returns [Error::SubscriptionClosed] when the store was dropped.
    pub fn has_changed(&self) -> Result<bool, Error> {
        self.receiver
            .has_changed()
            .map_err(|_| Error::SubscriptionClosed)
    }

    /// Wait until a new snapshot arrives.
    ///
    /// # Errors
    ///
    /// Returns [Error::SubscriptionClosed] when the store was dropped.
    pub async fn changed(&mut self) -> Result<(), Error> {
        self.receiver
            .changed()
            .await
            .map_err(|_| Error::SubscriptionClosed)
    }
}

/// Tracks the live subscriptions of a store backend.
///
/// Both backends keep one registry and call [SubscriberRegistry::notify]
/// after each successful write. Subscriptions whose receiver was dropped
/// are pruned on the next notification.
#[derive(Debug, Default)]
pub(crate) struct SubscriberRegistry {
    entries: Mutex<Vec<SubscriberEntry>>,
}

#[derive(Debug)]
struct SubscriberEntry {
    collection: String,
    scope: OwnerScope,
    sender: watch::Sender<Snapshot>,
}

impl SubscriberRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Open a subscription starting from `initial`.
    pub(crate) fn register(
        &self,
        collection: &str,
        scope: &OwnerScope,
        initial: Snapshot,
    ) -> Subscription {
        let (sender, receiver) = watch::channel(initial);

        self.entries.lock().unwrap().push(SubscriberEntry {
            collection: collection.to_string(),
            scope: scope.clone(),
            sender,
        });

        Subscription { receiver }
    }

    /// Push a fresh snapshot to every live subscription on the collections
    /// in `touched`, reading each snapshot through `snapshot_for`.
    pub(crate) fn notify<F>(&self, touched: &[&str], mut snapshot_for: F) -> Result<(), Error>
    where
        F: FnMut(&str, &OwnerScope) -> Result<Snapshot, Error>,
    {
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|entry| !entry.sender.is_closed());

        for entry in entries.iter() {
            if touched.contains(&entry.collection.as_str()) {
                let snapshot = snapshot_for(&entry.collection, &entry.scope)?;
                entry.sender.send_replace(snapshot);
            }
        }

        Ok(())
    }
}


#[cfg(test)]
mod write_batch_tests {
    use serde_json::{Map, json};

    use super::{BatchOp, WriteBatch};

    #[test]
    fn insert_assigns_distinct_ids() {
        let mut batch = WriteBatch::new();

        let first = batch.insert("transactions", Map::new());
        let second = batch.insert("transactions", Map::new());

        assert_ne!(first, second);
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn operations_keep_queue_order() {
        let mut batch = WriteBatch::new();
        let mut fields = Map::new();
        fields.insert("status".to_string(), json!("Pago"));

        let inserted_id = batch.insert("transactions", Map::new());
        batch.update("transactions", &inserted_id, fields);
        batch.delete("despesasFixas", &inserted_id);

        let operations = batch.into_operations();

        assert_eq!(operations.len(), 3);
        assert!(matches!(operations[0], BatchOp::Insert { .. }));
        assert!(matches!(operations[1], BatchOp::Update { .. }));
        assert!(matches!(operations[2], BatchOp::Delete { .. }));
        assert_eq!(operations[2].collection(), "despesasFixas");
    }

    #[test]
    fn new_batch_is_empty() {
        let batch = WriteBatch::new();

        assert!(batch.is_empty());
        assert_eq!(batch.len(), 0);
    }
}

#[cfg(test)]
mod document_tests {
    use serde_json::json;

    use super::{Document, DocumentId};

    #[test]
    fn owner_reads_the_uid_field() {
        let document = Document {
            id: DocumentId::new("doc-1"),
            fields: serde_json::Map::from_iter([("uid".to_string(), json!("user-1"))]),
        };

        assert_eq!(document.owner(), Some("user-1"));
    }

    #[test]
    fn owner_is_none_without_a_uid_field() {
        let document = Document {
            id: DocumentId::new("doc-1"),
            fields: serde_json::Map::new(),
        };

        assert_eq!(document.owner(), None);
    }

    #[test]
    fn random_ids_are_unique() {
        assert_ne!(DocumentId::random(), DocumentId::random());
    }
}
