//! Defines the data model and store operations for savings goals.

use serde_json::{Value, json};
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    Error, SaveOutcome,
    money::{amount_from_value, parse_amount},
    session::{Session, UserId},
    stores::{Document, DocumentId, DocumentStore, Fields, collections},
};

const WIRE_DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// A savings target the user is working towards.
#[derive(Debug, Clone, PartialEq)]
pub struct SavingsGoal {
    /// The ID of the stored document.
    pub id: DocumentId,
    /// The user who owns this goal.
    pub owner: UserId,
    /// What the user is saving for, e.g. "Viagem".
    pub title: String,
    /// The amount of money the goal needs.
    pub target_amount: f64,
    /// The amount of money put aside so far.
    pub saved_amount: f64,
    /// When the user expects to reach the goal.
    pub target_date: Option<Date>,
}

impl SavingsGoal {
    /// Decode a stored document.
    ///
    /// Decoding is lenient: missing or malformed amounts fall back to zero
    /// and an unreadable expectation date to "no date".
    pub fn from_document(document: &Document) -> Self {
        let fields = &document.fields;

        Self {
            id: document.id.clone(),
            owner: UserId::new(document.owner().unwrap_or_default()),
            title: fields
                .get("titulo")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            target_amount: amount_from_value(fields.get("valorEstimado")),
            saved_amount: amount_from_value(fields.get("valorAtual")),
            target_date: fields
                .get("dataExpectativa")
                .and_then(Value::as_str)
                .and_then(|text| Date::parse(text, WIRE_DATE_FORMAT).ok()),
        }
    }
}

/// Decode every document in a snapshot.
pub fn goals_from_snapshot(snapshot: &[Document]) -> Vec<SavingsGoal> {
    snapshot.iter().map(SavingsGoal::from_document).collect()
}

/// The fields of the savings goal form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GoalInput {
    /// What the user is saving for.
    pub title: String,
    /// The raw target amount string from the form.
    pub target_amount: String,
    /// The raw saved-so-far amount string from the form.
    pub saved_amount: String,
    /// When the user expects to reach the goal.
    pub target_date: Option<Date>,
}

impl GoalInput {
    /// The stored fields for this form, owner included.
    ///
    /// Unlike the other entry forms, goal edits rewrite the owner field
    /// along with everything else.
    pub fn fields(&self, session: &Session) -> Fields {
        let mut fields = Fields::new();
        fields.insert("titulo".to_string(), json!(self.title));
        fields.insert(
            "valorEstimado".to_string(),
            json!(parse_amount(&self.target_amount)),
        );
        fields.insert(
            "valorAtual".to_string(),
            json!(parse_amount(&self.saved_amount)),
        );
        fields.insert(
            "dataExpectativa".to_string(),
            match self.target_date {
                Some(date) => json!(date.to_string()),
                None => json!(""),
            },
        );
        fields.insert("uid".to_string(), json!(session.user_id.as_str()));

        fields
    }
}

/// Save the savings goal form.
///
/// Pass `editing` to update an existing goal. The goal form has no
/// required fields, so the save always writes and never reports
/// [SaveOutcome::Skipped].
///
/// # Errors
///
/// This function will return a:
/// - [Error::DocumentNotFound] if `editing` no longer refers to a stored
///   goal,
/// - or [Error::SqlError] if there is some other store error.
pub fn save_goal<S: DocumentStore>(
    store: &S,
    session: &Session,
    input: &GoalInput,
    editing: Option<&DocumentId>,
) -> Result<SaveOutcome, Error> {
    match editing {
        Some(id) => {
            store.update(collections::SAVINGS_GOALS, id, input.fields(session))?;

            Ok(SaveOutcome::Updated)
        }
        None => {
            let id = store.insert(collections::SAVINGS_GOALS, input.fields(session))?;

            Ok(SaveOutcome::Created(id))
        }
    }
}

/// Delete a single goal.
///
/// # Errors
///
/// This function will return an [Error::SqlError] if the delete could not
/// be executed.
pub fn delete_goal<S: DocumentStore>(store: &S, id: &DocumentId) -> Result<(), Error> {
    store.delete(collections::SAVINGS_GOALS, id)
}
