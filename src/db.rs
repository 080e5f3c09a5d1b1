/*! Database initialization for the FinSight core. */

use rusqlite::{Connection, Transaction as SqlTransaction};

use crate::{
    Error, achievement::create_user_achievement_table, budget::create_budget_table,
    category::create_category_table, goal::create_goal_table,
    transaction::create_transaction_table,
};

/// Create all of the application's tables if they do not exist yet.
///
/// Runs inside a single exclusive transaction so that two processes pointed
/// at the same database cannot interleave partial schemas.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Exclusive)?;

    // Categories first: transactions and budgets reference them.
    create_category_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_budget_table(&transaction)?;
    create_goal_table(&transaction)?;
    create_user_achievement_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
