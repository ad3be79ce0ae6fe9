//! Fixed-expense templates and their materialization into ledger entries.

mod core;
mod materializer;

pub use core::{
    DayOfMonth, FixedExpenseTemplate, TemplateInput, delete_template, save_template,
    templates_from_snapshot,
};
pub use materializer::{LoadOutcome, load_fixed_expenses};
