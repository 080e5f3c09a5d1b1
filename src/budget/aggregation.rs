//! Month-scoped spend aggregation for budgets.
//!
//! Spend totals are always recomputed from the transaction set, never
//! maintained incrementally. Recomputation is O(transactions) per query,
//! which is fine at the per-user volumes this store sees (thousands of rows,
//! not millions) and stays correct under any combination of imports, edits,
//! and recategorizations.

use rusqlite::Connection;
use time::Date;

use crate::{
    Error,
    budget::validate_month_key,
    database_id::{CategoryId, UserId},
    transaction::Transaction,
};

/// The `YYYY-MM` key of the month a date falls in.
pub fn month_key(date: Date) -> String {
    format!("{:04}-{:02}", date.year(), u8::from(date.month()))
}

/// Sums a category's expenses for one month from a transaction slice.
///
/// Only expenses count (`amount < 0`); income in the category does not offset
/// them. The result is the sum of absolute values, so it is non-negative, and
/// it does not depend on the order of `transactions`.
pub fn spent_in_month(transactions: &[Transaction], category_id: CategoryId, month: &str) -> f64 {
    transactions
        .iter()
        .filter(|transaction| {
            transaction.category_id == Some(category_id)
                && transaction.amount < 0.0
                && month_key(transaction.date) == month
        })
        .map(|transaction| transaction.amount.abs())
        .sum()
}

/// Recomputes the amount spent against a `(category, month)` budget from the
/// authoritative transaction store.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidDate] if `month` is not a `YYYY-MM` key,
/// - or [Error::SqlError] if there is some SQL error.
pub fn recompute_budget(
    user_id: UserId,
    category_id: CategoryId,
    month: &str,
    connection: &Connection,
) -> Result<f64, Error> {
    validate_month_key(month)?;

    // Stored dates are zero-padded ISO strings, so a month is a contiguous
    // string range.
    let month_start = format!("{month}-01");
    let month_end = format!("{month}-31");

    let spent: f64 = connection.query_row(
        "SELECT COALESCE(SUM(amount), 0.0) FROM \"transaction\"
         WHERE user_id = ?1 AND category_id = ?2 AND amount < 0
           AND date >= ?3 AND date <= ?4",
        (user_id, category_id, month_start, month_end),
        |row| row.get(0),
    )?;

    Ok(spent.abs())
}

/// The derived state of a budget for display and threshold checks.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetStatus {
    /// The spending limit the status was computed against.
    pub limit: f64,
    /// The amount spent in the budget's month.
    pub spent: f64,
    /// `round(spent / limit * 100)`; 0 when the limit is not positive, so a
    /// misconfigured budget can never divide by zero here.
    pub percent: i64,
    /// Whether the budget is exceeded. Spending exactly the limit is not
    /// exceeding it.
    pub exceeded: bool,
    /// Whether spend has entered the warning band between 80% and 100% of
    /// the limit (inclusive on both ends).
    pub near_limit: bool,
    /// How far over the limit spending went; 0 when not exceeded.
    pub overspend: f64,
}

impl BudgetStatus {
    /// Derive the status of a budget from its limit and recomputed spend.
    pub fn new(limit: f64, spent: f64) -> Self {
        let ratio = if limit > 0.0 { spent / limit } else { 0.0 };

        Self {
            limit,
            spent,
            percent: (ratio * 100.0).round() as i64,
            exceeded: spent > limit,
            near_limit: (0.8..=1.0).contains(&ratio),
            overspend: (spent - limit).max(0.0),
        }
    }
}
