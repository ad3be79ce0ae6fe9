//! Groups expense entries by category for the spending report.
//!
//! The report is recomputed from the full snapshot on every call: a
//! per-category totals map for the chart, plus the flat list of matching
//! entries for the detail table underneath it.

use std::collections::HashMap;

use crate::{month::CompetenceMonth, transaction::Transaction};

/// The catch-all bucket label for entries without a category.
pub const OTHER_CATEGORY_LABEL: &str = "Outro";

/// Which expense entries a report covers.
///
/// Each unset component means "no restriction"; the default filter covers
/// every expense entry in the snapshot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReportFilter {
    /// Keep only entries attributed to this competence month.
    pub month: Option<CompetenceMonth>,
    /// Keep only entries attributed to this competence year.
    pub year: Option<i32>,
    /// Keep only entries carrying exactly this category name.
    ///
    /// Entries without a category never match a set category filter, even
    /// though they land in the catch-all bucket when the filter is unset.
    pub category: Option<String>,
}

impl ReportFilter {
    /// Whether the entry passes every set component of this filter.
    pub fn matches(&self, transaction: &Transaction) -> bool {
        let month_matches = match self.month {
            Some(month) => transaction.competence_month == Some(month),
            None => true,
        };
        let year_matches = match self.year {
            Some(year) => transaction.competence_year == Some(year),
            None => true,
        };
        let category_matches = match &self.category {
            Some(category) => transaction.category.as_deref() == Some(category.as_str()),
            None => true,
        };

        month_matches && year_matches && category_matches
    }
}

/// A category spending report over one snapshot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CategoryReport {
    /// Summed amounts keyed by category label.
    pub totals: HashMap<String, f64>,
    /// The matching entries, one row per entry, in snapshot order.
    pub rows: Vec<Transaction>,
}

/// The category label an entry is bucketed under.
pub fn category_label(transaction: &Transaction) -> &str {
    transaction
        .category
        .as_deref()
        .unwrap_or(OTHER_CATEGORY_LABEL)
}

/// Builds the spending report for one snapshot of ledger entries.
///
/// Only expense entries are eligible; income never appears in the report.
/// Eligible entries that pass the filter are summed into per-category
/// buckets, with uncategorized entries collected under
/// [OTHER_CATEGORY_LABEL].
pub fn expense_report(transactions: &[Transaction], filter: &ReportFilter) -> CategoryReport {
    let mut totals = HashMap::new();
    let mut rows = Vec::new();

    for transaction in transactions {
        if !transaction.kind.is_expense() || !filter.matches(transaction) {
            continue;
        }

        *totals
            .entry(category_label(transaction).to_owned())
            .or_insert(0.0) += transaction.amount;
        rows.push(transaction.clone());
    }

    CategoryReport { totals, rows }
}

/// Converts a report's totals into `(label, total)` pairs for a bar chart.
///
/// Labels are sorted alphabetically with the catch-all bucket last.
pub fn chart_series(report: &CategoryReport) -> Vec<(String, f64)> {
    let mut labels: Vec<&str> = report
        .totals
        .keys()
        .map(String::as_str)
        .filter(|&label| label != OTHER_CATEGORY_LABEL)
        .collect();
    labels.sort();

    if report.totals.contains_key(OTHER_CATEGORY_LABEL) {
        labels.push(OTHER_CATEGORY_LABEL);
    }

    labels
        .into_iter()
        .map(|label| (label.to_owned(), report.totals[label]))
        .collect()
}
