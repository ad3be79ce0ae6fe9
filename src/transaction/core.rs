//! Defines the core data models and store operations for ledger entries.

use serde_json::{Value, json};
use time::{
    Date, OffsetDateTime, format_description::BorrowedFormatItem,
    format_description::well_known::Rfc3339, macros::format_description,
};

use crate::{
    Error, SaveOutcome,
    money::{amount_from_value, parse_amount},
    month::CompetenceMonth,
    session::{Session, UserId},
    stores::{Document, DocumentId, DocumentStore, Fields, collections},
};

/// Dates travel as plain `YYYY-MM-DD` strings, with the empty string
/// standing in for "no date".
const WIRE_DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

// ============================================================================
// MODELS
// ============================================================================

/// The direction of a ledger entry, stored on the wire under the `type`
/// field with Portuguese labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransactionType {
    /// Income.
    Receita,
    /// A recurring or planned expense.
    #[default]
    Despesa,
    /// A one-off purchase.
    Gasto,
}

impl TransactionType {
    /// The wire label for this type.
    pub fn label(self) -> &'static str {
        match self {
            TransactionType::Receita => "Receita",
            TransactionType::Despesa => "Despesa",
            TransactionType::Gasto => "Gasto",
        }
    }

    /// Parse a wire label.
    ///
    /// Unknown labels count as [TransactionType::Despesa] so that a single
    /// malformed record cannot poison a snapshot.
    pub fn from_label(label: &str) -> Self {
        match label {
            "Receita" => TransactionType::Receita,
            "Gasto" => TransactionType::Gasto,
            _ => TransactionType::Despesa,
        }
    }

    /// Whether entries of this type add to the running total.
    pub fn is_income(self) -> bool {
        self == TransactionType::Receita
    }

    /// Whether entries of this type appear in expense reports.
    pub fn is_expense(self) -> bool {
        matches!(self, TransactionType::Despesa | TransactionType::Gasto)
    }
}

/// Whether a ledger entry has been paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransactionStatus {
    /// The entry has been paid.
    Pago,
    /// The entry has not been paid yet.
    #[default]
    NaoPago,
}

impl TransactionStatus {
    /// The wire label for this status.
    pub fn label(self) -> &'static str {
        match self {
            TransactionStatus::Pago => "Pago",
            TransactionStatus::NaoPago => "Não Pago",
        }
    }

    /// Parse a wire label. Anything other than `"Pago"` counts as unpaid.
    pub fn from_label(label: &str) -> Self {
        match label {
            "Pago" => TransactionStatus::Pago,
            _ => TransactionStatus::NaoPago,
        }
    }

    /// Whether this status means the entry was paid.
    pub fn is_paid(self) -> bool {
        self == TransactionStatus::Pago
    }
}

/// An expense or income entry in the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// The ID of the stored document.
    pub id: DocumentId,
    /// The user who owns this entry.
    pub owner: UserId,
    /// The amount of money in this entry.
    ///
    /// Amounts carry no sign; the direction comes from `kind`.
    pub amount: f64,
    /// Whether this entry is income or an expense.
    pub kind: TransactionType,
    /// When the entry falls due.
    pub due_date: Option<Date>,
    /// When the entry was paid.
    pub payment_date: Option<Date>,
    /// A text description of what the entry was for.
    pub detail: String,
    /// Whether the entry has been paid.
    pub status: TransactionStatus,
    /// The accounting month this entry counts towards, independent of its
    /// due or payment date.
    pub competence_month: Option<CompetenceMonth>,
    /// The accounting year this entry counts towards.
    pub competence_year: Option<i32>,
    /// The expense category name.
    pub category: Option<String>,
    /// When the record was created.
    pub created_at: Option<OffsetDateTime>,
}

impl Transaction {
    /// Decode a stored document.
    ///
    /// Decoding is lenient: missing or malformed fields fall back to the
    /// values an empty entry form would produce (zero amount, unpaid
    /// status, absent dates) rather than failing the whole snapshot.
    pub fn from_document(document: &Document) -> Self {
        let fields = &document.fields;

        Self {
            id: document.id.clone(),
            owner: UserId::new(document.owner().unwrap_or_default()),
            amount: amount_from_value(fields.get("amount")),
            kind: fields
                .get("type")
                .and_then(Value::as_str)
                .map(TransactionType::from_label)
                .unwrap_or_default(),
            due_date: wire_date(fields.get("dueDate")),
            payment_date: wire_date(fields.get("paymentDate")),
            detail: fields
                .get("detail")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            status: fields
                .get("status")
                .and_then(Value::as_str)
                .map(TransactionStatus::from_label)
                .unwrap_or_default(),
            competence_month: fields
                .get("competenciaMes")
                .and_then(Value::as_str)
                .and_then(|label| label.parse().ok()),
            competence_year: competence_year_from_value(fields.get("competenciaAno")),
            category: fields
                .get("tipoDespesa")
                .and_then(Value::as_str)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
            created_at: created_at_from_value(fields.get("date")),
        }
    }
}

/// Decode every document in a snapshot.
pub fn transactions_from_snapshot(snapshot: &[Document]) -> Vec<Transaction> {
    snapshot.iter().map(Transaction::from_document).collect()
}

fn wire_date(value: Option<&Value>) -> Option<Date> {
    value
        .and_then(Value::as_str)
        .and_then(|text| Date::parse(text, WIRE_DATE_FORMAT).ok())
}

fn competence_year_from_value(value: Option<&Value>) -> Option<i32> {
    match value {
        Some(Value::Number(number)) => number.as_i64().map(|year| year as i32),
        Some(Value::String(text)) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Decode the creation timestamp.
///
/// Current records store `{ seconds, nanoseconds }`; records from older
/// exports hold an ISO 8601 string.
fn created_at_from_value(value: Option<&Value>) -> Option<OffsetDateTime> {
    match value? {
        Value::Object(map) => {
            let seconds = map.get("seconds")?.as_i64()?;

            OffsetDateTime::from_unix_timestamp(seconds).ok()
        }
        Value::String(text) => OffsetDateTime::parse(text, &Rfc3339).ok().or_else(|| {
            Date::parse(text, WIRE_DATE_FORMAT)
                .ok()
                .map(|date| date.midnight().assume_utc())
        }),
        _ => None,
    }
}

fn date_or_blank(date: Option<Date>) -> Value {
    match date {
        Some(date) => json!(date.to_string()),
        None => json!(""),
    }
}

// ============================================================================
// STORE FUNCTIONS
// ============================================================================

/// The fields of the ledger entry form.
///
/// The amount stays a raw string so that a blank submission can be skipped
/// the same way the form skips it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionInput {
    /// The raw amount string from the form.
    pub amount: String,
    /// The entry direction.
    pub kind: TransactionType,
    /// When the entry falls due.
    pub due_date: Option<Date>,
    /// When the entry was paid.
    pub payment_date: Option<Date>,
    /// A text description of the entry.
    pub detail: String,
    /// Whether the entry was already paid.
    pub status: TransactionStatus,
    /// The accounting month.
    pub competence_month: Option<CompetenceMonth>,
    /// The accounting year.
    pub competence_year: Option<i32>,
    /// The expense category name.
    pub category: Option<String>,
}

impl TransactionInput {
    /// The fields for a brand new entry, owner and creation timestamp
    /// included.
    pub fn create_fields(&self, session: &Session, now: OffsetDateTime) -> Fields {
        let mut fields = self.shared_fields();
        fields.insert("uid".to_string(), json!(session.user_id.as_str()));
        fields.insert(
            "date".to_string(),
            json!({
                "seconds": now.unix_timestamp(),
                "nanoseconds": now.nanosecond(),
            }),
        );

        fields
    }

    /// The fields for editing an existing entry.
    ///
    /// The owner and creation timestamp are left untouched by edits.
    pub fn update_fields(&self) -> Fields {
        self.shared_fields()
    }

    fn shared_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("amount".to_string(), json!(parse_amount(&self.amount)));
        fields.insert("type".to_string(), json!(self.kind.label()));
        fields.insert("dueDate".to_string(), date_or_blank(self.due_date));
        fields.insert("paymentDate".to_string(), date_or_blank(self.payment_date));
        fields.insert("detail".to_string(), json!(self.detail));
        fields.insert("status".to_string(), json!(self.status.label()));
        fields.insert(
            "competenciaMes".to_string(),
            match self.competence_month {
                Some(month) => json!(month.label()),
                None => json!(""),
            },
        );
        fields.insert(
            "competenciaAno".to_string(),
            match self.competence_year {
                Some(year) => json!(year),
                None => json!(""),
            },
        );

        if let Some(category) = &self.category {
            fields.insert("tipoDespesa".to_string(), json!(category));
        }

        fields
    }
}

/// Save the ledger entry form.
///
/// Pass `editing` to update an existing entry instead of creating a new
/// one. A blank amount means the form was submitted empty, so nothing is
/// written and the save reports [SaveOutcome::Skipped].
///
/// # Errors
///
/// This function will return a:
/// - [Error::DocumentNotFound] if `editing` no longer refers to a stored
///   entry,
/// - or [Error::SqlError] if there is some other store error.
pub fn save_transaction<S: DocumentStore>(
    store: &S,
    session: &Session,
    input: &TransactionInput,
    editing: Option<&DocumentId>,
    now: OffsetDateTime,
) -> Result<SaveOutcome, Error> {
    if input.amount.trim().is_empty() {
        return Ok(SaveOutcome::Skipped);
    }

    match editing {
        Some(id) => {
            store.update(collections::TRANSACTIONS, id, input.update_fields())?;

            Ok(SaveOutcome::Updated)
        }
        None => {
            let id = store.insert(collections::TRANSACTIONS, input.create_fields(session, now))?;

            Ok(SaveOutcome::Created(id))
        }
    }
}

/// Delete a single ledger entry.
///
/// # Errors
///
/// This function will return an [Error::SqlError] if the delete could not
/// be executed.
pub fn delete_transaction<S: DocumentStore>(store: &S, id: &DocumentId) -> Result<(), Error> {
    store.delete(collections::TRANSACTIONS, id)
}
