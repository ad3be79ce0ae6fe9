//! Ledger entries and the operations the ledger screen performs on them:
//! saving and deleting single entries, filtering snapshots, and bulk
//! mutations over a selection.

mod bulk;
mod core;
mod filter;

pub use bulk::{DeleteConfirmed, Selection, delete_selected, mark_selected_paid};
pub use core::{
    Transaction, TransactionInput, TransactionStatus, TransactionType, delete_transaction,
    save_transaction, transactions_from_snapshot,
};
pub use filter::{
    DateField, DateRangeFilter, filter_by_competence, filter_by_date_range, signed_total,
};
