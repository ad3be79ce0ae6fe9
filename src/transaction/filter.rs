//! Pure filters and totals over a snapshot of ledger entries.
//!
//! Every function here recomputes from the full snapshot, so a fresh
//! snapshot from a [crate::stores::Subscription] can simply be run through
//! the same filters again.

use time::Date;

use crate::{month::Competence, transaction::Transaction};

/// Which of an entry's dates a range filter compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateField {
    /// The record creation timestamp.
    #[default]
    Created,
    /// The entry's due date.
    DueDate,
    /// The entry's payment date.
    PaymentDate,
}

/// An inclusive calendar date range over one of an entry's date fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRangeFilter {
    /// Which date field to compare.
    pub field: DateField,
    /// The first day included in the range.
    pub start: Option<Date>,
    /// The last day included in the range.
    pub end: Option<Date>,
}

impl DateRangeFilter {
    /// Whether the entry passes this filter.
    ///
    /// The range only applies once both bounds are set; with either bound
    /// missing every entry passes. Once both are set, entries without the
    /// compared date are excluded.
    pub fn matches(&self, transaction: &Transaction) -> bool {
        let (Some(start), Some(end)) = (self.start, self.end) else {
            return true;
        };

        match date_for(transaction, self.field) {
            Some(date) => start <= date && date <= end,
            None => false,
        }
    }
}

fn date_for(transaction: &Transaction, field: DateField) -> Option<Date> {
    match field {
        DateField::Created => transaction.created_at.map(|created| created.date()),
        DateField::DueDate => transaction.due_date,
        DateField::PaymentDate => transaction.payment_date,
    }
}

/// The entries that fall inside a date range, in snapshot order.
pub fn filter_by_date_range(
    transactions: &[Transaction],
    filter: &DateRangeFilter,
) -> Vec<Transaction> {
    transactions
        .iter()
        .filter(|transaction| filter.matches(transaction))
        .cloned()
        .collect()
}

/// The entries attributed to the given accounting period.
///
/// Both the month label and the year must match exactly; entries without a
/// competence never match.
pub fn filter_by_competence(
    transactions: &[Transaction],
    competence: Competence,
) -> Vec<Transaction> {
    transactions
        .iter()
        .filter(|transaction| {
            transaction.competence_month == Some(competence.month)
                && transaction.competence_year == Some(competence.year)
        })
        .cloned()
        .collect()
}

/// The running total of a set of entries.
///
/// Income adds to the total, every other entry type subtracts, regardless
/// of paid status.
pub fn signed_total(transactions: &[Transaction]) -> f64 {
    transactions.iter().fold(0.0, |total, transaction| {
        if transaction.kind.is_income() {
            total + transaction.amount
        } else {
            total - transaction.amount
        }
    })
}
