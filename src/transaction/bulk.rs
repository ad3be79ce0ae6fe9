//! Bulk operations over a set of selected ledger entries.

use serde_json::json;

use crate::{
    Error,
    stores::{DocumentId, DocumentStore, Fields, WriteBatch, collections},
    transaction::{Transaction, TransactionStatus},
};

/// The entries currently ticked in the ledger table.
///
/// The select-all flag remembers whether the last "select all" tick is
/// active, so ticking it again clears the selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    ids: Vec<DocumentId>,
    all_selected: bool,
}

impl Selection {
    /// Create an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tick or untick a single entry.
    pub fn toggle(&mut self, id: &DocumentId) {
        if let Some(position) = self.ids.iter().position(|selected| selected == id) {
            self.ids.remove(position);
        } else {
            self.ids.push(id.clone());
        }
    }

    /// Tick every entry currently visible, or clear the selection if the
    /// last "select all" is still active.
    ///
    /// Only the entries passed in are selected, so a filtered table selects
    /// exactly what the user can see.
    pub fn toggle_all(&mut self, visible: &[Transaction]) {
        if self.all_selected {
            self.ids.clear();
        } else {
            self.ids = visible.iter().map(|transaction| transaction.id.clone()).collect();
        }

        self.all_selected = !self.all_selected;
    }

    /// Untick everything.
    pub fn clear(&mut self) {
        self.ids.clear();
        self.all_selected = false;
    }

    /// Whether the entry is ticked.
    pub fn contains(&self, id: &DocumentId) -> bool {
        self.ids.contains(id)
    }

    /// Whether nothing is ticked.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The number of ticked entries.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// The ticked entry IDs, in tick order.
    pub fn ids(&self) -> &[DocumentId] {
        &self.ids
    }
}

/// Proof that the user answered the bulk delete confirmation prompt with
/// yes.
///
/// [delete_selected] will not compile without one, so every call site shows
/// where the confirmation happened.
#[derive(Debug, Clone, Copy)]
pub struct DeleteConfirmed(());

impl DeleteConfirmed {
    /// Record a confirmed prompt.
    pub fn acknowledged() -> Self {
        Self(())
    }
}

/// Mark every selected entry as paid, in one atomic batch.
///
/// An empty selection is a no-op. The selection is cleared once the batch
/// commits; a failed commit keeps it intact.
///
/// # Errors
///
/// This function will return a:
/// - [Error::DocumentNotFound] if a selected entry was deleted in the
///   meantime, in which case no entry is updated,
/// - or [Error::SqlError] if there is some other store error.
pub fn mark_selected_paid<S: DocumentStore>(
    store: &S,
    selection: &mut Selection,
) -> Result<usize, Error> {
    if selection.is_empty() {
        return Ok(0);
    }

    let mut batch = WriteBatch::new();

    for id in selection.ids() {
        let fields = Fields::from_iter([(
            "status".to_string(),
            json!(TransactionStatus::Pago.label()),
        )]);
        batch.update(collections::TRANSACTIONS, id, fields);
    }

    let count = batch.len();
    store.commit(batch)?;
    selection.clear();

    Ok(count)
}

/// Delete every selected entry, in one atomic batch.
///
/// An empty selection is a no-op. The selection is cleared once the batch
/// commits; a failed commit keeps it intact.
///
/// # Errors
///
/// This function will return an [Error::SqlError] if the batch could not be
/// committed, in which case no entry is deleted.
pub fn delete_selected<S: DocumentStore>(
    store: &S,
    selection: &mut Selection,
    _confirmed: DeleteConfirmed,
) -> Result<usize, Error> {
    if selection.is_empty() {
        return Ok(0);
    }

    let mut batch = WriteBatch::new();

    for id in selection.ids() {
        batch.delete(collections::TRANSACTIONS, id);
    }

    let count = batch.len();
    store.commit(batch)?;
    selection.clear();

    Ok(count)
}


#[cfg(test)]
mod bulk_mutation_tests {
    use time::macros::datetime;

    use crate::{
        Error, SaveOutcome,
        session::{Session, UserId},
        stores::{DocumentId, DocumentStore, MemoryDocumentStore, OwnerScope, collections},
        transaction::{
            Transaction, TransactionInput, TransactionStatus, save_transaction,
            transactions_from_snapshot,
        },
    };

    use super::{DeleteConfirmed, Selection, delete_selected, mark_selected_paid};

    fn saved_entry(store: &MemoryDocumentStore, session: &Session, detail: &str) -> DocumentId {
        let input = TransactionInput {
            amount: "100".to_string(),
            detail: detail.to_string(),
            ..TransactionInput::default()
        };

        let outcome =
            save_transaction(store, session, &input, None, datetime!(2025-05-01 12:00 UTC))
                .unwrap();

        match outcome {
            SaveOutcome::Created(id) => id,
            other => panic!("expected a created entry, got {other:?}"),
        }
    }

    fn snapshot(store: &MemoryDocumentStore, session: &Session) -> Vec<Transaction> {
        let documents = store
            .query(
                collections::TRANSACTIONS,
                &OwnerScope::User(session.user_id.clone()),
            )
            .unwrap();

        transactions_from_snapshot(&documents)
    }

    #[test]
    fn mark_selected_paid_updates_only_the_selection() {
        let store = MemoryDocumentStore::new();
        let session = Session::new(UserId::new("user-1"));
        let first = saved_entry(&store, &session, "rent");
        let second = saved_entry(&store, &session, "power");
        saved_entry(&store, &session, "water");

        let mut selection = Selection::new();
        selection.toggle(&first);
        selection.toggle(&second);

        let updated = mark_selected_paid(&store, &mut selection).unwrap();

        assert_eq!(updated, 2);
        assert!(selection.is_empty());

        for transaction in snapshot(&store, &session) {
            let want = if transaction.detail == "water" {
                TransactionStatus::NaoPago
            } else {
                TransactionStatus::Pago
            };
            assert_eq!(transaction.status, want, "entry {}", transaction.detail);
        }
    }

    #[test]
    fn empty_selection_is_a_no_op() {
        let store = MemoryDocumentStore::new();
        let session = Session::new(UserId::new("user-1"));
        saved_entry(&store, &session, "rent");

        let mut selection = Selection::new();

        assert_eq!(mark_selected_paid(&store, &mut selection), Ok(0));
        assert_eq!(
            delete_selected(&store, &mut selection, DeleteConfirmed::acknowledged()),
            Ok(0)
        );
        assert_eq!(snapshot(&store, &session).len(), 1);
    }

    #[test]
    fn delete_selected_removes_exactly_the_selection() {
        let store = MemoryDocumentStore::new();
        let session = Session::new(UserId::new("user-1"));
        let first = saved_entry(&store, &session, "rent");
        saved_entry(&store, &session, "power");
        let third = saved_entry(&store, &session, "water");

        let mut selection = Selection::new();
        selection.toggle(&first);
        selection.toggle(&third);

        let deleted = delete_selected(&store, &mut selection, DeleteConfirmed::acknowledged())
            .unwrap();

        assert_eq!(deleted, 2);
        assert!(selection.is_empty());

        let survivors = snapshot(&store, &session);
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].detail, "power");
    }

    #[test]
    fn failed_batch_keeps_the_selection() {
        let store = MemoryDocumentStore::new();
        let session = Session::new(UserId::new("user-1"));
        let existing = saved_entry(&store, &session, "rent");
        let missing = DocumentId::new("already-deleted");

        let mut selection = Selection::new();
        selection.toggle(&existing);
        selection.toggle(&missing);

        let result = mark_selected_paid(&store, &mut selection);

        assert_eq!(result, Err(Error::DocumentNotFound));
        assert_eq!(selection.len(), 2);

        // The batch failed as a whole, so the existing entry is untouched.
        let transactions = snapshot(&store, &session);
        assert_eq!(transactions[0].status, TransactionStatus::NaoPago);
    }
}
