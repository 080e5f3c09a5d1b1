//! Monthly spending budgets and their derived spend totals.

mod aggregation;
mod core;

pub use self::aggregation::{BudgetStatus, month_key, recompute_budget, spent_in_month};
pub use self::core::{Budget, create_budget_table, delete_budget, list_budgets, upsert_budget};

pub(crate) use self::core::validate_month_key;
