//! Implements an in-memory document store, used in tests and demos.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use crate::{
    Error,
    stores::{
        BatchOp, Document, DocumentId, DocumentStore, Fields, OwnerScope, Snapshot,
        SubscriberRegistry, Subscription, WriteBatch,
    },
};

/// Stores documents in process memory, preserving insertion order.
///
/// Every write goes through [DocumentStore::commit], staged against a copy
/// of the data so that a failing batch leaves the store untouched.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    collections: Arc<Mutex<HashMap<String, Vec<Document>>>>,
    subscribers: Arc<SubscriberRegistry>,
}

impl MemoryDocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn scoped(documents: Option<&Vec<Document>>, scope: &OwnerScope) -> Snapshot {
    documents
        .map(|documents| {
            documents
                .iter()
                .filter(|document| scope.matches(document.owner()))
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

/// Apply one operation, reporting whether it changed anything.
fn apply(
    collections: &mut HashMap<String, Vec<Document>>,
    operation: BatchOp,
) -> Result<bool, Error> {
    match operation {
        BatchOp::Insert {
            collection,
            document,
        } => {
            collections.entry(collection).or_default().push(document);

            Ok(true)
        }
        BatchOp::Update {
            collection,
            id,
            fields,
        } => {
            let document = collections
                .get_mut(&collection)
                .and_then(|documents| documents.iter_mut().find(|document| document.id == id))
                .ok_or(Error::DocumentNotFound)?;

            for (name, value) in fields {
                document.fields.insert(name, value);
            }

            Ok(true)
        }
        BatchOp::Delete { collection, id } => {
            let Some(documents) = collections.get_mut(&collection) else {
                return Ok(false);
            };

            let count_before = documents.len();
            documents.retain(|document| document.id != id);

            Ok(documents.len() != count_before)
        }
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn insert(&self, collection: &str, fields: Fields) -> Result<DocumentId, Error> {
        let mut batch = WriteBatch::new();
        let id = batch.insert(collection, fields);
        self.commit(batch)?;

        Ok(id)
    }

    fn update(&self, collection: &str, id: &DocumentId, fields: Fields) -> Result<(), Error> {
        let mut batch = WriteBatch::new();
        batch.update(collection, id, fields);

        self.commit(batch)
    }

    fn delete(&self, collection: &str, id: &DocumentId) -> Result<(), Error> {
        let mut batch = WriteBatch::new();
        batch.delete(collection, id);

        self.commit(batch)
    }

    fn query(&self, collection: &str, scope: &OwnerScope) -> Result<Snapshot, Error> {
        let collections = self.collections.lock().unwrap();

        Ok(scoped(collections.get(collection), scope))
    }

    /// Open a live view of `collection`.
    ///
    /// The data lock is held until the subscription is registered so that no
    /// write can slip between the initial snapshot and the registration.
    fn subscribe(&self, collection: &str, scope: &OwnerScope) -> Result<Subscription, Error> {
        let collections = self.collections.lock().unwrap();
        let initial = scoped(collections.get(collection), scope);

        Ok(self.subscribers.register(collection, scope, initial))
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), Error> {
        if batch.is_empty() {
            return Ok(());
        }

        let operations = batch.into_operations();
        let touched: Vec<String> = operations
            .iter()
            .map(|operation| operation.collection().to_string())
            .collect();
        let touched: Vec<&str> = touched.iter().map(String::as_str).collect();

        let mut collections = self.collections.lock().unwrap();

        let mut staged = collections.clone();
        let mut effective = false;

        for operation in operations {
            effective |= apply(&mut staged, operation)?;
        }

        if !effective {
            return Ok(());
        }

        *collections = staged;

        self.subscribers.notify(&touched, |collection, scope| {
            Ok(scoped(collections.get(collection), scope))
        })
    }
}

#[cfg(test)]
mod memory_document_store_tests {
    use serde_json::json;

    use crate::{
        Error,
        session::UserId,
        stores::{DocumentStore, Fields, OwnerScope, SHARED_OWNER, WriteBatch},
    };

    use super::MemoryDocumentStore;

    fn fields(owner: &str, detail: &str) -> Fields {
        Fields::from_iter([
            ("uid".to_string(), json!(owner)),
            ("detail".to_string(), json!(detail)),
        ])
    }

    #[test]
    fn query_returns_only_documents_in_scope() {
        let store = MemoryDocumentStore::new();
        store.insert("transactions", fields("user-1", "mine")).unwrap();
        store.insert("transactions", fields("user-2", "theirs")).unwrap();

        let snapshot = store
            .query("transactions", &OwnerScope::User(UserId::new("user-1")))
            .unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].field("detail"), Some(&json!("mine")));
    }

    #[test]
    fn user_or_shared_scope_includes_sentinel_documents() {
        let store = MemoryDocumentStore::new();
        store.insert("tiposDespesa", fields("user-1", "mine")).unwrap();
        store
            .insert("tiposDespesa", fields(SHARED_OWNER, "shared"))
            .unwrap();
        store.insert("tiposDespesa", fields("user-2", "theirs")).unwrap();

        let snapshot = store
            .query(
                "tiposDespesa",
                &OwnerScope::UserOrShared(UserId::new("user-1")),
            )
            .unwrap();

        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn update_merges_fields_and_keeps_the_rest() {
        let store = MemoryDocumentStore::new();
        let id = store.insert("transactions", fields("user-1", "rent")).unwrap();

        store
            .update(
                "transactions",
                &id,
                Fields::from_iter([("status".to_string(), json!("Pago"))]),
            )
            .unwrap();

        let snapshot = store
            .query("transactions", &OwnerScope::User(UserId::new("user-1")))
            .unwrap();

        assert_eq!(snapshot[0].field("status"), Some(&json!("Pago")));
        assert_eq!(snapshot[0].field("detail"), Some(&json!("rent")));
    }

    #[test]
    fn update_of_missing_document_returns_not_found() {
        let store = MemoryDocumentStore::new();
        let id = store.insert("transactions", fields("user-1", "rent")).unwrap();
        store.delete("transactions", &id).unwrap();

        let result = store.update(
            "transactions",
            &id,
            Fields::from_iter([("status".to_string(), json!("Pago"))]),
        );

        assert_eq!(result, Err(Error::DocumentNotFound));
    }

    #[test]
    fn delete_is_idempotent() {
        let store = MemoryDocumentStore::new();
        let id = store.insert("transactions", fields("user-1", "rent")).unwrap();

        assert_eq!(store.delete("transactions", &id), Ok(()));
        assert_eq!(store.delete("transactions", &id), Ok(()));

        let snapshot = store
            .query("transactions", &OwnerScope::User(UserId::new("user-1")))
            .unwrap();
        assert!(snapshot.is_empty());
    }

    #[test]
    fn subscription_receives_a_snapshot_after_each_write() {
        let store = MemoryDocumentStore::new();
        let scope = OwnerScope::User(UserId::new("user-1"));
        let mut subscription = store.subscribe("transactions", &scope).unwrap();

        assert!(subscription.snapshot().is_empty());

        store.insert("transactions", fields("user-1", "rent")).unwrap();

        assert_eq!(subscription.has_changed(), Ok(true));
        assert_eq!(subscription.snapshot().len(), 1);
        assert_eq!(subscription.has_changed(), Ok(false));
    }

    #[test]
    fn subscription_is_scoped_to_its_owner() {
        let store = MemoryDocumentStore::new();
        let scope = OwnerScope::User(UserId::new("user-1"));
        let mut subscription = store.subscribe("transactions", &scope).unwrap();

        store.insert("transactions", fields("user-2", "theirs")).unwrap();

        // The write still pushes a snapshot, but the snapshot is empty.
        assert_eq!(subscription.has_changed(), Ok(true));
        assert!(subscription.snapshot().is_empty());
    }

    #[test]
    fn failed_batch_leaves_the_store_untouched() {
        let store = MemoryDocumentStore::new();
        let scope = OwnerScope::User(UserId::new("user-1"));
        let existing_id = store.insert("transactions", fields("user-1", "rent")).unwrap();
        store.delete("transactions", &existing_id).unwrap();

        let mut subscription = store.subscribe("transactions", &scope).unwrap();

        let mut batch = WriteBatch::new();
        batch.insert("transactions", fields("user-1", "groceries"));
        batch.update(
            "transactions",
            &existing_id,
            Fields::from_iter([("status".to_string(), json!("Pago"))]),
        );

        assert_eq!(store.commit(batch), Err(Error::DocumentNotFound));
        assert_eq!(subscription.has_changed(), Ok(false));
        assert!(subscription.snapshot().is_empty());
    }

    #[test]
    fn deleting_a_missing_document_does_not_notify() {
        let store = MemoryDocumentStore::new();
        let id = store.insert("transactions", fields("user-1", "rent")).unwrap();
        store.delete("transactions", &id).unwrap();

        let scope = OwnerScope::User(UserId::new("user-1"));
        let subscription = store.subscribe("transactions", &scope).unwrap();

        store.delete("transactions", &id).unwrap();

        assert_eq!(subscription.has_changed(), Ok(false));
    }

    #[test]
    fn batch_writes_arrive_as_one_snapshot() {
        let store = MemoryDocumentStore::new();
        let scope = OwnerScope::User(UserId::new("user-1"));
        let mut subscription = store.subscribe("transactions", &scope).unwrap();

        let mut batch = WriteBatch::new();
        batch.insert("transactions", fields("user-1", "rent"));
        batch.insert("transactions", fields("user-1", "power"));
        store.commit(batch).unwrap();

        assert_eq!(subscription.snapshot().len(), 2);
    }
}
