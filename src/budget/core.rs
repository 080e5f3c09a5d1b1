//! Budget model and database operations.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    database_id::{BudgetId, CategoryId, UserId},
};

/// A monthly spending limit for one category.
///
/// The amount actually spent is never stored on the budget: it is derived
/// from the transaction set on demand (see [crate::budget::recompute_budget])
/// so that edits, imports, and recategorizations can never leave a stale
/// total behind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    /// The ID of the budget.
    pub id: BudgetId,
    /// The user that owns the budget.
    pub user_id: UserId,
    /// The category the limit applies to.
    pub category_id: CategoryId,
    /// The spending limit for the month. Always greater than zero.
    pub limit: f64,
    /// The month the budget applies to, as a `YYYY-MM` key.
    pub month: String,
}

/// Create or update the budget for `(category_id, month)`.
///
/// A user has at most one budget per category and month; upserting an
/// existing pair replaces its limit and keeps the same row.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidBudgetLimit] if `limit` is not a positive, finite number,
/// - or [Error::InvalidDate] if `month` is not a `YYYY-MM` key,
/// - or [Error::InvalidCategory] if `category_id` does not refer to a real category,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn upsert_budget(
    user_id: UserId,
    category_id: CategoryId,
    limit: f64,
    month: &str,
    connection: &Connection,
) -> Result<Budget, Error> {
    if !limit.is_finite() || limit <= 0.0 {
        return Err(Error::InvalidBudgetLimit(limit));
    }

    validate_month_key(month)?;

    connection
        .prepare(
            "INSERT INTO budget (user_id, category_id, spending_limit, month)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id, category_id, month) DO UPDATE SET
                 spending_limit = excluded.spending_limit
             RETURNING id, user_id, category_id, spending_limit, month",
        )?
        .query_row((user_id, category_id, limit, month), map_budget_row)
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::InvalidCategory(Some(category_id)),
            error => error.into(),
        })
}

/// Retrieve all of a user's budgets, newest month first.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn list_budgets(user_id: UserId, connection: &Connection) -> Result<Vec<Budget>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, category_id, spending_limit, month FROM budget
             WHERE user_id = :user_id ORDER BY month DESC, category_id ASC;",
        )?
        .query_map(&[(":user_id", &user_id)], map_budget_row)?
        .map(|maybe_budget| maybe_budget.map_err(|error| error.into()))
        .collect()
}

/// Delete a budget by ID.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingBudget] if the budget doesn't exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_budget(
    user_id: UserId,
    budget_id: BudgetId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM budget WHERE user_id = ?1 AND id = ?2",
        (user_id, budget_id),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingBudget);
    }

    Ok(())
}

/// Checks that `month` is a well-formed `YYYY-MM` key.
pub(crate) fn validate_month_key(month: &str) -> Result<(), Error> {
    let invalid = || Error::InvalidDate(month.to_owned());

    let (year, month_number) = month.split_once('-').ok_or_else(invalid)?;

    if year.len() != 4 || month_number.len() != 2 {
        return Err(invalid());
    }

    year.parse::<u16>().map_err(|_| invalid())?;
    let month_number: u8 = month_number.parse().map_err(|_| invalid())?;

    if !(1..=12).contains(&month_number) {
        return Err(invalid());
    }

    Ok(())
}

/// Initialize the budget table.
///
/// Budgets are deleted together with their category: a limit without a
/// category to scope it is meaningless, unlike transactions which merely
/// become uncategorized.
pub fn create_budget_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS budget (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            category_id INTEGER NOT NULL,
            spending_limit REAL NOT NULL,
            month TEXT NOT NULL,
            FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE CASCADE,
            UNIQUE(user_id, category_id, month)
        );

        CREATE INDEX IF NOT EXISTS idx_budget_user_month ON budget(user_id, month);",
    )?;

    Ok(())
}

fn map_budget_row(row: &Row) -> Result<Budget, rusqlite::Error> {
    let id = row.get(0)?;
    let user_id = row.get(1)?;
    let category_id = row.get(2)?;
    let limit = row.get(3)?;
    let month = row.get(4)?;

    Ok(Budget {
        id,
        user_id,
        category_id,
        limit,
        month,
    })
}

#[cfg(test)]
mod budget_query_tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        budget::{delete_budget, list_budgets, upsert_budget},
        category::{Category, CategoryName, create_category},
        database_id::UserId,
        db::initialize,
    };

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
    }

    fn create_test_category(user_id: UserId, name: &str, connection: &Connection) -> Category {
        create_category(
            user_id,
            CategoryName::new_unchecked(name),
            "tag",
            "#cccccc",
            connection,
        )
        .expect("Could not create test category")
    }

    #[test]
    fn upsert_creates_a_budget() {
        let connection = get_test_connection();
        let user_id = UserId::new(42);
        let category = create_test_category(user_id, "Mercado", &connection);

        let budget = upsert_budget(user_id, category.id, 300.0, "2024-07", &connection)
            .expect("Could not create budget");

        assert!(budget.id > 0);
        assert_eq!(budget.limit, 300.0);
        assert_eq!(budget.month, "2024-07");
    }

    #[test]
    fn upsert_replaces_the_limit_for_an_existing_month() {
        let connection = get_test_connection();
        let user_id = UserId::new(42);
        let category = create_test_category(user_id, "Mercado", &connection);
        let original = upsert_budget(user_id, category.id, 300.0, "2024-07", &connection)
            .expect("Could not create budget");

        let updated = upsert_budget(user_id, category.id, 450.0, "2024-07", &connection)
            .expect("Could not update budget");

        assert_eq!(updated.id, original.id, "upsert must keep the same row");
        assert_eq!(updated.limit, 450.0);
        assert_eq!(
            list_budgets(user_id, &connection)
                .expect("Could not list budgets")
                .len(),
            1
        );
    }

    #[test]
    fn distinct_months_get_distinct_budgets() {
        let connection = get_test_connection();
        let user_id = UserId::new(42);
        let category = create_test_category(user_id, "Mercado", &connection);

        upsert_budget(user_id, category.id, 300.0, "2024-07", &connection)
            .expect("Could not create budget");
        upsert_budget(user_id, category.id, 320.0, "2024-08", &connection)
            .expect("Could not create budget");

        let budgets = list_budgets(user_id, &connection).expect("Could not list budgets");
        assert_eq!(budgets.len(), 2);
    }

    #[test]
    fn non_positive_limits_are_rejected() {
        let connection = get_test_connection();
        let user_id = UserId::new(42);
        let category = create_test_category(user_id, "Mercado", &connection);

        assert_eq!(
            upsert_budget(user_id, category.id, 0.0, "2024-07", &connection),
            Err(Error::InvalidBudgetLimit(0.0))
        );
        assert_eq!(
            upsert_budget(user_id, category.id, -5.0, "2024-07", &connection),
            Err(Error::InvalidBudgetLimit(-5.0))
        );
    }

    #[test]
    fn malformed_month_keys_are_rejected() {
        let connection = get_test_connection();
        let user_id = UserId::new(42);
        let category = create_test_category(user_id, "Mercado", &connection);

        for month in ["2024", "07-2024", "2024-13", "2024-7", "julho"] {
            let result = upsert_budget(user_id, category.id, 300.0, month, &connection);
            assert_eq!(
                result,
                Err(Error::InvalidDate(month.to_owned())),
                "want month key '{month}' rejected"
            );
        }
    }

    #[test]
    fn upsert_fails_on_invalid_category() {
        let connection = get_test_connection();
        let user_id = UserId::new(42);

        let result = upsert_budget(user_id, 999, 300.0, "2024-07", &connection);

        assert_eq!(result, Err(Error::InvalidCategory(Some(999))));
    }

    #[test]
    fn delete_missing_budget_fails() {
        let connection = get_test_connection();

        let result = delete_budget(UserId::new(42), 999, &connection);

        assert_eq!(result, Err(Error::DeleteMissingBudget));
    }
}
