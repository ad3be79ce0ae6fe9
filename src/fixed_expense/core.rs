//! Defines the data models and store operations for fixed-expense
//! templates.

use serde_json::{Value, json};

use crate::{
    Error, SaveOutcome,
    money::{amount_from_value, parse_amount},
    month::CompetenceMonth,
    session::{Session, UserId},
    stores::{Document, DocumentId, DocumentStore, Fields, collections},
    transaction::TransactionType,
};

/// The day of the month a fixed expense falls due, between 1 and 31.
///
/// The day is validated against the calendar maximum, not against any
/// particular month: day 31 is a valid template day even though not every
/// month has one. See [crate::fixed_expense::load_fixed_expenses] for how
/// such days materialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayOfMonth(u8);

impl DayOfMonth {
    /// Create a day of the month.
    ///
    /// # Errors
    ///
    /// Returns an [Error::InvalidDayOfMonth] when `day` lies outside 1 to 31.
    pub fn new(day: i64) -> Result<Self, Error> {
        if (1..=31).contains(&day) {
            Ok(Self(day as u8))
        } else {
            Err(Error::InvalidDayOfMonth(day))
        }
    }

    /// Create a day of the month, substituting day 1 for out-of-range
    /// values.
    ///
    /// Stored templates without a usable day behave as if due on the first.
    pub fn new_clamped(day: i64) -> Self {
        Self::new(day).unwrap_or(Self(1))
    }

    /// The day number.
    pub fn get(self) -> u8 {
        self.0
    }
}

/// A recurring expense or income definition, materialized into dated ledger
/// entries on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedExpenseTemplate {
    /// The ID of the stored document.
    pub id: DocumentId,
    /// The user who owns this template.
    pub owner: UserId,
    /// A short description, e.g. "Internet".
    pub description: String,
    /// The entry type that materialized entries will carry.
    pub kind: TransactionType,
    /// The day of the month the expense falls due.
    pub day: DayOfMonth,
    /// Restrict the template to a single month. `None` materializes every
    /// month.
    pub month: Option<CompetenceMonth>,
    /// The amount of money, always a magnitude.
    pub amount: f64,
    /// The expense category name, copied onto materialized entries.
    pub category: Option<String>,
}

impl FixedExpenseTemplate {
    /// Decode a stored document.
    ///
    /// Decoding is lenient in the same way
    /// [crate::transaction::Transaction::from_document] is: the day falls
    /// back to 1, the amount to zero, and an unreadable month restriction
    /// to "every month".
    pub fn from_document(document: &Document) -> Self {
        let fields = &document.fields;

        Self {
            id: document.id.clone(),
            owner: UserId::new(document.owner().unwrap_or_default()),
            description: fields
                .get("descricao")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            kind: fields
                .get("tipo")
                .and_then(Value::as_str)
                .map(TransactionType::from_label)
                .unwrap_or_default(),
            day: DayOfMonth::new_clamped(day_from_value(fields.get("dia"))),
            month: fields
                .get("mes")
                .and_then(Value::as_str)
                .and_then(|label| label.parse().ok()),
            amount: amount_from_value(fields.get("valor")),
            category: fields
                .get("tipoDespesa")
                .and_then(Value::as_str)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
        }
    }
}

/// Decode every document in a snapshot.
pub fn templates_from_snapshot(snapshot: &[Document]) -> Vec<FixedExpenseTemplate> {
    snapshot.iter().map(FixedExpenseTemplate::from_document).collect()
}

/// Days are stored as numbers by current clients and as the raw form string
/// by older ones.
fn day_from_value(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(number)) => number.as_i64().unwrap_or(0),
        Some(Value::String(text)) => text.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// The fields of the fixed-expense template form.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateInput {
    /// A short description, e.g. "Internet".
    pub description: String,
    /// The entry type that materialized entries will carry.
    pub kind: TransactionType,
    /// The day of the month the expense falls due. `None` while the form
    /// field is blank.
    pub day: Option<DayOfMonth>,
    /// Restrict the template to a single month.
    pub month: Option<CompetenceMonth>,
    /// The raw amount string from the form.
    pub amount: String,
    /// The expense category name.
    pub category: Option<String>,
}

impl Default for TemplateInput {
    fn default() -> Self {
        Self {
            description: String::new(),
            // The template form starts on one-off purchases, not income.
            kind: TransactionType::Gasto,
            day: None,
            month: None,
            amount: String::new(),
            category: None,
        }
    }
}

impl TemplateInput {
    /// The fields for a brand new template, owner included.
    pub fn create_fields(&self, session: &Session, day: DayOfMonth) -> Fields {
        let mut fields = self.shared_fields(day);
        fields.insert("uid".to_string(), json!(session.user_id.as_str()));

        fields
    }

    /// The fields for editing an existing template. The owner is left
    /// untouched by edits.
    pub fn update_fields(&self, day: DayOfMonth) -> Fields {
        self.shared_fields(day)
    }

    fn shared_fields(&self, day: DayOfMonth) -> Fields {
        let mut fields = Fields::new();
        fields.insert("descricao".to_string(), json!(self.description));
        fields.insert("tipo".to_string(), json!(self.kind.label()));
        fields.insert("dia".to_string(), json!(day.get()));
        fields.insert(
            "mes".to_string(),
            match self.month {
                Some(month) => json!(month.label()),
                None => json!(""),
            },
        );
        fields.insert("valor".to_string(), json!(parse_amount(&self.amount)));

        if let Some(category) = &self.category {
            fields.insert("tipoDespesa".to_string(), json!(category));
        }

        fields
    }
}

/// Save the fixed-expense template form.
///
/// Pass `editing` to update an existing template. A blank description or a
/// blank day means the form is incomplete, so nothing is written and the
/// save reports [SaveOutcome::Skipped].
///
/// # Errors
///
/// This function will return a:
/// - [Error::DocumentNotFound] if `editing` no longer refers to a stored
///   template,
/// - or [Error::SqlError] if there is some other store error.
pub fn save_template<S: DocumentStore>(
    store: &S,
    session: &Session,
    input: &TemplateInput,
    editing: Option<&DocumentId>,
) -> Result<SaveOutcome, Error> {
    let Some(day) = input.day else {
        return Ok(SaveOutcome::Skipped);
    };

    if input.description.trim().is_empty() {
        return Ok(SaveOutcome::Skipped);
    }

    match editing {
        Some(id) => {
            store.update(collections::FIXED_EXPENSES, id, input.update_fields(day))?;

            Ok(SaveOutcome::Updated)
        }
        None => {
            let id = store.insert(
                collections::FIXED_EXPENSES,
                input.create_fields(session, day),
            )?;

            Ok(SaveOutcome::Created(id))
        }
    }
}

/// Delete a single template.
///
/// # Errors
///
/// This function will return an [Error::SqlError] if the delete could not
/// be executed.
pub fn delete_template<S: DocumentStore>(store: &S, id: &DocumentId) -> Result<(), Error> {
    store.delete(collections::FIXED_EXPENSES, id)
}
