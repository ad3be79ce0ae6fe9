//! Finanças is the data and logic layer of a personal finance tracker:
//! income and expense transactions, recurring fixed expenses, expense
//! categories, savings goals, and category reports, all scoped to a
//! signed-in user.
//!
//! Records live in a document store ([stores::DocumentStore]) that supports
//! owner-scoped live queries and atomic write batches; two backends are
//! provided (in-memory and SQLite). The aggregation, materialization, bulk
//! mutation, and reporting operations are synchronous functions over
//! already-fetched snapshots, so a presentation layer can recompute derived
//! values from scratch on every snapshot delivery.

#![warn(missing_docs)]

pub mod category;
pub mod fixed_expense;
pub mod money;
pub mod month;
pub mod report;
pub mod savings_goal;
pub mod session;
pub mod stores;
pub mod transaction;

pub use month::{Competence, CompetenceMonth};
pub use session::{AuthChannel, AuthState, AuthWatcher, Session, UserId, require_session};
pub use stores::{DocumentId, DocumentStore, MemoryDocumentStore, SQLiteDocumentStore};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A store operation was attempted while authentication was still
    /// loading or after the user signed out.
    ///
    /// Callers must wait for the auth state to settle on a signed-in
    /// session before issuing queries.
    #[error("no signed-in user")]
    NotSignedIn,

    /// Tried to edit or delete a built-in category that is shared by all
    /// users.
    ///
    /// This is rejected locally, before any store call is made.
    #[error("built-in categories cannot be edited or deleted")]
    SharedCategoryProtected,

    /// An empty string was used to create a category name.
    #[error("category name cannot be empty")]
    EmptyCategoryName,

    /// A fixed expense template was given a day of month outside 1-31.
    #[error("{0} is not a valid day of month")]
    InvalidDayOfMonth(i64),

    /// A string did not match any of the twelve competence month labels.
    #[error("\"{0}\" is not a competence month")]
    InvalidMonthName(String),

    /// A merge update referred to a document that is not in the store.
    ///
    /// Deletes are idempotent and do not produce this error; only updates
    /// require the target document to exist.
    #[error("the document could not be found in the store")]
    DocumentNotFound,

    /// The store behind a subscription was dropped, so no further
    /// snapshots will be delivered.
    #[error("the subscription is closed")]
    SubscriptionClosed,

    /// A stored document's fields could not be converted to or from JSON.
    #[error("could not serialize document fields: {0}")]
    JSONSerializationError(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::DocumentNotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::JSONSerializationError(value.to_string())
    }
}

/// The result of a form-driven save operation.
///
/// Saves mirror the submit flow of the entry forms: blank required fields
/// cause the operation to be skipped silently rather than raising an
/// error.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// A new document was inserted with the returned id.
    Created(stores::DocumentId),
    /// An existing document was merge-updated in place.
    Updated,
    /// A required field was blank; nothing was written.
    Skipped,
}

impl SaveOutcome {
    /// Whether the save wrote anything to the store.
    pub fn wrote(&self) -> bool {
        !matches!(self, SaveOutcome::Skipped)
    }
}
