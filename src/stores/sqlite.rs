//! Implements a SQLite backed document store.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{
    Error,
    stores::{
        BatchOp, Document, DocumentId, DocumentStore, Fields, OwnerScope, SHARED_OWNER, Snapshot,
        SubscriberRegistry, Subscription, WriteBatch,
    },
};

/// Create the document table and its owner index.
///
/// Documents are stored as JSON text in a single table. The owner column
/// mirrors each document's `uid` field so that scope queries stay indexed.
///
/// # Errors
///
/// Returns an [Error::SqlError] if the table could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS document (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            owner TEXT,
            fields TEXT NOT NULL,
            PRIMARY KEY (collection, id)
        );

        CREATE INDEX IF NOT EXISTS document_owner_index
            ON document (collection, owner);",
    )?;

    Ok(())
}

/// Stores documents in a SQLite database.
#[derive(Debug, Clone)]
pub struct SQLiteDocumentStore {
    connection: Arc<Mutex<Connection>>,
    subscribers: Arc<SubscriberRegistry>,
}

impl SQLiteDocumentStore {
    /// Create a new document store with a SQLite database.
    ///
    /// The connection is expected to have been set up with [initialize].
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self {
            connection,
            subscribers: Arc::new(SubscriberRegistry::new()),
        }
    }
}

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<(String, String)> {
    Ok((row.get(0)?, row.get(1)?))
}

fn read_snapshot(
    connection: &Connection,
    collection: &str,
    scope: &OwnerScope,
) -> Result<Snapshot, Error> {
    let rows: Vec<(String, String)> = match scope {
        OwnerScope::User(user_id) => connection
            .prepare(
                "SELECT id, fields FROM document
                WHERE collection = :collection AND owner = :owner
                ORDER BY rowid;",
            )?
            .query_map(
                &[(":collection", collection), (":owner", user_id.as_str())],
                map_row,
            )?
            .collect::<Result<_, _>>()?,
        OwnerScope::UserOrShared(user_id) => connection
            .prepare(
                "SELECT id, fields FROM document
                WHERE collection = :collection AND owner IN (:owner, :shared)
                ORDER BY rowid;",
            )?
            .query_map(
                &[
                    (":collection", collection),
                    (":owner", user_id.as_str()),
                    (":shared", SHARED_OWNER),
                ],
                map_row,
            )?
            .collect::<Result<_, _>>()?,
    };

    rows.into_iter()
        .map(|(id, fields_text)| {
            let fields: Fields = serde_json::from_str(&fields_text)?;

            Ok(Document {
                id: DocumentId::new(id),
                fields,
            })
        })
        .collect()
}

/// Apply one operation, reporting whether it changed anything.
fn apply_operation(connection: &Connection, operation: BatchOp) -> Result<bool, Error> {
    match operation {
        BatchOp::Insert {
            collection,
            document,
        } => {
            let owner = document.owner().map(str::to_string);
            let fields_text = serde_json::to_string(&document.fields)?;

            connection.execute(
                "INSERT INTO document (collection, id, owner, fields) VALUES (?1, ?2, ?3, ?4);",
                (&collection, document.id.as_str(), &owner, &fields_text),
            )?;

            Ok(true)
        }
        BatchOp::Update {
            collection,
            id,
            fields,
        } => {
            let fields_text: String = connection
                .prepare(
                    "SELECT fields FROM document
                    WHERE collection = :collection AND id = :id;",
                )?
                .query_row(
                    &[(":collection", collection.as_str()), (":id", id.as_str())],
                    |row| row.get(0),
                )?;

            let mut merged: Fields = serde_json::from_str(&fields_text)?;

            for (name, value) in fields {
                merged.insert(name, value);
            }

            let owner = merged.get("uid").and_then(serde_json::Value::as_str);
            let merged_text = serde_json::to_string(&merged)?;

            connection.execute(
                "UPDATE document SET owner = ?1, fields = ?2 WHERE collection = ?3 AND id = ?4;",
                (&owner, &merged_text, &collection, id.as_str()),
            )?;

            Ok(true)
        }
        BatchOp::Delete { collection, id } => {
            let deleted = connection.execute(
                "DELETE FROM document WHERE collection = ?1 AND id = ?2;",
                (&collection, id.as_str()),
            )?;

            Ok(deleted > 0)
        }
    }
}

impl DocumentStore for SQLiteDocumentStore {
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
        let connection = self.connection.lock().unwrap();

        read_snapshot(&connection, collection, scope)
    }

    /// Open a live view of `collection`.
    ///
    /// The connection lock is held until the subscription is registered so
    /// that no write can slip between the initial snapshot and the
    /// registration.
    fn subscribe(&self, collection: &str, scope: &OwnerScope) -> Result<Subscription, Error> {
        let connection = self.connection.lock().unwrap();
        let initial = read_snapshot(&connection, collection, scope)?;

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

        let connection = self.connection.lock().unwrap();

        let tx = connection.unchecked_transaction()?;
        let mut effective = false;

        for operation in operations {
            effective |= apply_operation(&tx, operation)?;
        }

        tx.commit()?;

        if !effective {
            return Ok(());
        }

        self.subscribers.notify(&touched, |collection, scope| {
            read_snapshot(&connection, collection, scope)
        })
    }
}

#[cfg(test)]
mod sqlite_document_store_tests {
    use std::sync::{Arc, Mutex};

    use rusqlite::Connection;
    use serde_json::json;

    use crate::{
        Error,
        session::UserId,
        stores::{DocumentStore, Fields, OwnerScope, SHARED_OWNER, WriteBatch},
    };

    use super::{SQLiteDocumentStore, initialize};

    fn get_test_store() -> SQLiteDocumentStore {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();

        SQLiteDocumentStore::new(Arc::new(Mutex::new(connection)))
    }

    fn fields(owner: &str, detail: &str) -> Fields {
        Fields::from_iter([
            ("uid".to_string(), json!(owner)),
            ("detail".to_string(), json!(detail)),
        ])
    }

    #[test]
    fn query_returns_documents_in_insertion_order() {
        let store = get_test_store();
        store.insert("transactions", fields("user-1", "first")).unwrap();
        store.insert("transactions", fields("user-1", "second")).unwrap();
        store.insert("transactions", fields("user-2", "theirs")).unwrap();

        let snapshot = store
            .query("transactions", &OwnerScope::User(UserId::new("user-1")))
            .unwrap();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].field("detail"), Some(&json!("first")));
        assert_eq!(snapshot[1].field("detail"), Some(&json!("second")));
    }

    #[test]
    fn user_or_shared_scope_includes_sentinel_documents() {
        let store = get_test_store();
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
        let store = get_test_store();
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

        assert_eq!(snapshot[0].id, id);
        assert_eq!(snapshot[0].field("status"), Some(&json!("Pago")));
        assert_eq!(snapshot[0].field("detail"), Some(&json!("rent")));
    }

    #[test]
    fn update_of_missing_document_returns_not_found() {
        let store = get_test_store();

        let result = store.update(
            "transactions",
            &crate::stores::DocumentId::new("missing"),
            Fields::from_iter([("status".to_string(), json!("Pago"))]),
        );

        assert_eq!(result, Err(Error::DocumentNotFound));
    }

    #[test]
    fn delete_is_idempotent() {
        let store = get_test_store();
        let id = store.insert("transactions", fields("user-1", "rent")).unwrap();

        assert_eq!(store.delete("transactions", &id), Ok(()));
        assert_eq!(store.delete("transactions", &id), Ok(()));
    }

    #[test]
    fn failed_batch_rolls_back_every_operation() {
        let store = get_test_store();

        let mut batch = WriteBatch::new();
        batch.insert("transactions", fields("user-1", "groceries"));
        batch.update(
            "transactions",
            &crate::stores::DocumentId::new("missing"),
            Fields::from_iter([("status".to_string(), json!("Pago"))]),
        );

        assert_eq!(store.commit(batch), Err(Error::DocumentNotFound));

        let snapshot = store
            .query("transactions", &OwnerScope::User(UserId::new("user-1")))
            .unwrap();
        assert!(snapshot.is_empty());
    }

    #[test]
    fn subscription_receives_a_snapshot_after_each_write() {
        let store = get_test_store();
        let scope = OwnerScope::User(UserId::new("user-1"));
        let mut subscription = store.subscribe("transactions", &scope).unwrap();

        store.insert("transactions", fields("user-1", "rent")).unwrap();

        assert_eq!(subscription.has_changed(), Ok(true));
        assert_eq!(subscription.snapshot().len(), 1);
    }

    #[test]
    fn batch_writes_arrive_as_one_snapshot() {
        let store = get_test_store();
        let scope = OwnerScope::User(UserId::new("user-1"));
        let mut subscription = store.subscribe("transactions", &scope).unwrap();

        let mut batch = WriteBatch::new();
        batch.insert("transactions", fields("user-1", "rent"));
        batch.insert("transactions", fields("user-1", "power"));
        store.commit(batch).unwrap();

        assert_eq!(subscription.snapshot().len(), 2);
    }
}
