//! Core engine for FinSight, a personal finance tracker.
//!
//! This library implements the parts of the application that live below the
//! web UI: parsing bank statement exports into normalized transactions,
//! merging them into a user's transaction set without creating duplicates,
//! recomputing month-scoped budget spend, tracking savings goals, and
//! evaluating the achievement catalog.
//!
//! The UI, authentication, and AI-assisted flows are external collaborators;
//! this crate exposes plain function calls over a [rusqlite::Connection].

#![warn(missing_docs)]

mod achievement;
mod budget;
mod category;
mod database_id;
mod db;
mod goal;
mod import;
mod statement;
mod transaction;

pub use achievement::{
    AchievementDefinition, Condition, EvaluationSnapshot, UserAchievement, default_catalog,
    evaluate_achievements, list_unlocked_achievements, record_unlock, unlock_for_condition,
};
pub use budget::{
    Budget, BudgetStatus, delete_budget, list_budgets, month_key, recompute_budget, spent_in_month,
    upsert_budget,
};
pub use category::{
    Category, CategoryName, create_category, delete_category, get_category, list_categories,
    update_category,
};
pub use database_id::{
    AchievementId, BudgetId, CategoryId, DatabaseId, GoalId, TransactionId, UserId,
};
pub use db::initialize;
pub use goal::{
    Goal, GoalStatus, add_contribution, create_goal, delete_goal, get_goal, list_goals,
    sweep_overdue_goals, update_goal,
};
pub use import::{ImportOutcome, import_statement};
pub use statement::{
    FormatHint, ParseOutcome, ParsedRow, RawRecord, fingerprint, normalize_rows, parse_statement,
};
pub use transaction::{
    MergeOutcome, Transaction, TransactionBuilder, clear_transactions, count_transactions,
    create_transaction, existing_fingerprints, get_transaction, list_transactions, merge_new,
    set_transaction_category,
};

/// The errors that may occur in the core.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// An empty string was used to create a category name.
    #[error("Category name cannot be empty")]
    EmptyCategoryName,

    /// The category ID attached to a transaction or budget did not match a
    /// valid category.
    #[error("the category ID does not refer to a valid category")]
    InvalidCategory(Option<CategoryId>),

    /// The specified category name already exists for this user.
    #[error("the category \"{0}\" already exists")]
    DuplicateCategoryName(String),

    /// A transaction with the same content fingerprint already exists.
    ///
    /// Statement rows are fingerprinted over their date, description, and
    /// amount. Rejecting duplicate fingerprints keeps re-uploads of the same
    /// (or an overlapping) statement from importing a transaction twice.
    #[error("a transaction with this fingerprint already exists")]
    DuplicateFingerprint,

    /// The statement text had issues that prevented it from being parsed at
    /// all, e.g. no recognizable header or delimiter.
    ///
    /// Individual malformed rows never cause this error; they are skipped
    /// and counted instead.
    #[error("Could not parse the statement: {0}")]
    InvalidStatement(String),

    /// A stored or normalized date string could not be read back as a
    /// calendar date.
    #[error("could not parse \"{0}\" as a calendar date")]
    InvalidDate(String),

    /// A budget was created or updated with a non-positive spending limit.
    ///
    /// Rejected synchronously at creation time so that spend percentages
    /// never have to divide by zero or a negative limit at query time.
    #[error("{0} is not a valid budget limit, the limit must be greater than zero")]
    InvalidBudgetLimit(f64),

    /// A goal contribution must add a positive amount.
    #[error("{0} is not a valid contribution amount")]
    InvalidContribution(f64),

    /// The condition tag does not match any achievement in the catalog.
    #[error("no achievement in the catalog has the condition \"{0}\"")]
    UnknownCondition(String),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// Tried to update a transaction that does not exist
    #[error("tried to update a transaction that is not in the database")]
    UpdateMissingTransaction,

    /// Tried to update a category that does not exist
    #[error("tried to update a category that is not in the database")]
    UpdateMissingCategory,

    /// Tried to delete a category that does not exist
    #[error("tried to delete a category that is not in the database")]
    DeleteMissingCategory,

    /// Tried to delete a budget that does not exist
    #[error("tried to delete a budget that is not in the database")]
    DeleteMissingBudget,

    /// Tried to update a goal that does not exist
    #[error("tried to update a goal that is not in the database")]
    UpdateMissingGoal,

    /// Tried to delete a goal that does not exist
    #[error("tried to delete a goal that is not in the database")]
    DeleteMissingGoal,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("transaction.fingerprint") =>
            {
                Error::DuplicateFingerprint
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}
