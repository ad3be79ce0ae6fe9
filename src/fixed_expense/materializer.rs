//! Projects fixed-expense templates into dated ledger entries.

use time::{Date, Duration, OffsetDateTime};

use crate::{
    Error,
    fixed_expense::templates_from_snapshot,
    month::Competence,
    session::Session,
    stores::{DocumentStore, OwnerScope, WriteBatch, collections},
    transaction::{TransactionInput, TransactionStatus},
};

/// The caller-visible outcome of a materialization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The number of entries written.
    Loaded(usize),
    /// No template applied to the target month, so nothing was written.
    NothingToLoad,
}

/// Materialize the user's fixed-expense templates into unpaid ledger
/// entries for the target competence period.
///
/// Templates restricted to a different month are skipped. Each matching
/// template becomes one entry due on the template's day within the target
/// month, carrying the template's type, amount, description and category.
/// All entries are written in a single atomic batch; when no template
/// matches, nothing is written at all.
///
/// The template day is not clamped to the target month's length: day 31
/// materialized for Fevereiro rolls over into March, the plain calendar sum
/// of the first of the month and the day offset.
///
/// Materialization keeps no memory of earlier runs. Running it twice for
/// the same period inserts every matching entry twice.
///
/// # Errors
///
/// This function will return an [Error::SqlError] if the templates could
/// not be read or the batch could not be committed. A failed commit writes
/// nothing.
pub fn load_fixed_expenses<S: DocumentStore>(
    store: &S,
    session: &Session,
    target: Competence,
    now: OffsetDateTime,
) -> Result<LoadOutcome, Error> {
    let documents = store.query(
        collections::FIXED_EXPENSES,
        &OwnerScope::User(session.user_id.clone()),
    )?;
    let templates = templates_from_snapshot(&documents);

    let Ok(first_of_month) =
        Date::from_calendar_date(target.year, target.month.as_time_month(), 1)
    else {
        tracing::warn!(
            year = target.year,
            "competence year is outside the supported calendar range"
        );

        return Ok(LoadOutcome::NothingToLoad);
    };

    let mut batch = WriteBatch::new();

    for template in &templates {
        if template.month.is_some_and(|month| month != target.month) {
            continue;
        }

        let day_offset = Duration::days(i64::from(template.day.get()) - 1);
        let Some(due_date) = first_of_month.checked_add(day_offset) else {
            continue;
        };

        let input = TransactionInput {
            amount: template.amount.to_string(),
            kind: template.kind,
            due_date: Some(due_date),
            payment_date: None,
            detail: template.description.clone(),
            status: TransactionStatus::NaoPago,
            competence_month: Some(target.month),
            competence_year: Some(target.year),
            category: template.category.clone(),
        };

        batch.insert(collections::TRANSACTIONS, input.create_fields(session, now));
    }

    if batch.is_empty() {
        return Ok(LoadOutcome::NothingToLoad);
    }

    let count = batch.len();
    store.commit(batch)?;

    Ok(LoadOutcome::Loaded(count))
}
