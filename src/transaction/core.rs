//! Defines the core data models and database queries for transactions.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    database_id::{CategoryId, DatabaseId, TransactionId, UserId},
    statement::fingerprint,
};

// ============================================================================
// MODELS
// ============================================================================

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: DatabaseId,
    /// The user that owns the transaction.
    pub user_id: UserId,
    /// The amount of money spent or earned in this transaction.
    /// Negative values are expenses, positive values are income.
    pub amount: f64,
    /// When the transaction happened.
    pub date: Date,
    /// A text description of what the transaction was for.
    pub description: String,
    /// Content fingerprint over the date, description, and amount.
    ///
    /// Unique per user; this is what keeps re-uploaded statements from
    /// creating duplicate records.
    pub fingerprint: i64,
    /// The ID of the category the transaction belongs to, if any.
    pub category_id: Option<CategoryId>,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(amount: f64, date: Date, description: &str) -> TransactionBuilder {
        TransactionBuilder {
            amount,
            date,
            description: description.to_owned(),
            category_id: None,
        }
    }
}

/// A builder for creating [Transaction] instances.
///
/// The fingerprint is not set by the caller: it is always derived from the
/// date, description, and amount when the transaction is stored, so manual
/// entries and statement imports share the same identity scheme.
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// The monetary amount of the transaction. Negative values are expenses.
    pub amount: f64,
    /// The date when the transaction occurred.
    pub date: Date,
    /// A human-readable description of the transaction.
    pub description: String,
    /// The category of the transaction, e.g. "Mercado", "Transporte".
    pub category_id: Option<CategoryId>,
}

impl TransactionBuilder {
    /// Set the category for the transaction.
    pub fn category_id(mut self, category_id: Option<CategoryId>) -> Self {
        self.category_id = category_id;
        self
    }

    /// The content fingerprint the stored transaction will carry.
    pub fn fingerprint(&self) -> i64 {
        fingerprint(&iso_date_string(self.date), &self.description, self.amount)
    }
}

/// Formats a date the way it is stored and fingerprinted: ISO `YYYY-MM-DD`.
pub(crate) fn iso_date_string(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create a new transaction in the database from a builder.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidCategory] if the category ID does not refer to a real category,
/// - or [Error::DuplicateFingerprint] if the user already has a transaction
///   with the same date, description, and amount,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    user_id: UserId,
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "INSERT INTO \"transaction\" (user_id, amount, date, description, fingerprint, category_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING id, user_id, amount, date, description, fingerprint, category_id",
        )?
        .query_row(
            (
                user_id,
                builder.amount,
                builder.date,
                &builder.description,
                builder.fingerprint(),
                builder.category_id,
            ),
            map_transaction_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::InvalidCategory(builder.category_id),
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicateFingerprint,
            error => error.into(),
        })?;

    Ok(transaction)
}

/// Retrieve a transaction by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction owned by `user_id`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_transaction(
    user_id: UserId,
    id: TransactionId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "SELECT id, user_id, amount, date, description, fingerprint, category_id
             FROM \"transaction\" WHERE user_id = :user_id AND id = :id",
        )?
        .query_row(
            &[(":user_id", &user_id.as_i64()), (":id", &id)],
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Retrieve all of a user's transactions, oldest first.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn list_transactions(user_id: UserId, connection: &Connection) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, amount, date, description, fingerprint, category_id
             FROM \"transaction\" WHERE user_id = :user_id ORDER BY date ASC, id ASC",
        )?
        .query_map(&[(":user_id", &user_id)], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(|error| error.into()))
        .collect()
}

/// Get the total number of transactions a user has.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn count_transactions(user_id: UserId, connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row(
            "SELECT COUNT(id) FROM \"transaction\" WHERE user_id = ?1;",
            [user_id],
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Set or clear a transaction's category.
///
/// This is the only mutation transactions support: amounts, dates, and
/// descriptions are immutable once stored because the fingerprint is derived
/// from them.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingTransaction] if `id` does not refer to a transaction owned by `user_id`,
/// - or [Error::InvalidCategory] if `category_id` does not refer to a real category,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn set_transaction_category(
    user_id: UserId,
    id: TransactionId,
    category_id: Option<CategoryId>,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection
        .execute(
            "UPDATE \"transaction\" SET category_id = ?1 WHERE user_id = ?2 AND id = ?3",
            (category_id, user_id, id),
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::InvalidCategory(category_id),
            error => error.into(),
        })?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingTransaction);
    }

    Ok(())
}

/// Delete all of a user's transactions and return how many were removed.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn clear_transactions(user_id: UserId, connection: &Connection) -> Result<usize, Error> {
    connection
        .execute("DELETE FROM \"transaction\" WHERE user_id = ?1", [user_id])
        .map_err(|error| error.into())
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                amount REAL NOT NULL,
                date TEXT NOT NULL,
                description TEXT NOT NULL,
                fingerprint INTEGER NOT NULL,
                category_id INTEGER,
                FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE SET NULL,
                UNIQUE(user_id, fingerprint)
                )",
        (),
    )?;

    // Covers the month-scoped aggregation queries.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_user_date ON \"transaction\"(user_id, date, category_id);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let user_id = row.get(1)?;
    let amount = row.get(2)?;
    let date = row.get(3)?;
    let description = row.get(4)?;
    let fingerprint = row.get(5)?;
    let category_id = row.get(6)?;

    Ok(Transaction {
        id,
        user_id,
        amount,
        date,
        description,
        fingerprint,
        category_id,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        category::{CategoryName, create_category},
        database_id::UserId,
        db::initialize,
        transaction::{
            Transaction, clear_transactions, count_transactions, create_transaction,
            get_transaction, list_transactions, set_transaction_category,
        },
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    #[test]
    fn create_succeeds() {
        let conn = get_test_connection();
        let user_id = UserId::new(42);
        let amount = 12.3;

        let result = create_transaction(
            user_id,
            Transaction::build(amount, date!(2025 - 10 - 05), "Mercado"),
            &conn,
        );

        match result {
            Ok(transaction) => {
                assert_eq!(transaction.amount, amount);
                assert_eq!(transaction.user_id, user_id);
            }
            Err(error) => panic!("Unexpected error: {error}"),
        }
    }

    #[test]
    fn create_fails_on_duplicate_fingerprint() {
        let conn = get_test_connection();
        let user_id = UserId::new(42);
        let today = date!(2025 - 10 - 04);
        create_transaction(user_id, Transaction::build(123.45, today, "Mercado"), &conn)
            .expect("Could not create transaction");

        let duplicate =
            create_transaction(user_id, Transaction::build(123.45, today, "Mercado"), &conn);

        assert_eq!(duplicate, Err(Error::DuplicateFingerprint));
    }

    #[test]
    fn same_content_is_not_a_duplicate_across_users() {
        let conn = get_test_connection();
        let today = date!(2025 - 10 - 04);
        create_transaction(
            UserId::new(1),
            Transaction::build(123.45, today, "Mercado"),
            &conn,
        )
        .expect("Could not create transaction");

        let result = create_transaction(
            UserId::new(2),
            Transaction::build(123.45, today, "Mercado"),
            &conn,
        );

        assert!(
            result.is_ok(),
            "want transaction created for a different user, got {result:?}"
        );
    }

    #[test]
    fn create_fails_on_invalid_category_id() {
        let conn = get_test_connection();
        let user_id = UserId::new(42);
        let category_id = Some(99);

        let result = create_transaction(
            user_id,
            Transaction::build(123.45, date!(2025 - 10 - 04), "Mercado").category_id(category_id),
            &conn,
        );

        assert_eq!(result, Err(Error::InvalidCategory(category_id)));
    }

    #[test]
    fn get_returns_only_the_owners_transaction() {
        let conn = get_test_connection();
        let owner = UserId::new(1);
        let transaction = create_transaction(
            owner,
            Transaction::build(-9.99, date!(2025 - 10 - 04), "Padaria"),
            &conn,
        )
        .expect("Could not create transaction");

        assert_eq!(
            get_transaction(owner, transaction.id, &conn),
            Ok(transaction.clone())
        );
        assert_eq!(
            get_transaction(UserId::new(2), transaction.id, &conn),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn set_category_updates_the_transaction() {
        let conn = get_test_connection();
        let user_id = UserId::new(42);
        let category = create_category(
            user_id,
            CategoryName::new("Mercado").unwrap(),
            "shopping-cart",
            "#ff7a00",
            &conn,
        )
        .expect("Could not create category");
        let transaction = create_transaction(
            user_id,
            Transaction::build(-50.0, date!(2025 - 10 - 04), "Mercado"),
            &conn,
        )
        .expect("Could not create transaction");

        set_transaction_category(user_id, transaction.id, Some(category.id), &conn)
            .expect("Could not set category");

        let got = get_transaction(user_id, transaction.id, &conn)
            .expect("Could not get transaction");
        assert_eq!(got.category_id, Some(category.id));
    }

    #[test]
    fn set_category_fails_on_missing_transaction() {
        let conn = get_test_connection();

        let result = set_transaction_category(UserId::new(42), 999, None, &conn);

        assert_eq!(result, Err(Error::UpdateMissingTransaction));
    }

    #[test]
    fn list_returns_transactions_oldest_first() {
        let conn = get_test_connection();
        let user_id = UserId::new(42);
        create_transaction(
            user_id,
            Transaction::build(-3.0, date!(2025 - 10 - 05), "c"),
            &conn,
        )
        .unwrap();
        create_transaction(
            user_id,
            Transaction::build(-1.0, date!(2025 - 10 - 01), "a"),
            &conn,
        )
        .unwrap();
        create_transaction(
            user_id,
            Transaction::build(-2.0, date!(2025 - 10 - 03), "b"),
            &conn,
        )
        .unwrap();

        let got = list_transactions(user_id, &conn).expect("Could not list transactions");

        let descriptions: Vec<&str> = got.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(descriptions, vec!["a", "b", "c"]);
    }

    #[test]
    fn get_count() {
        let conn = get_test_connection();
        let user_id = UserId::new(42);
        let today = date!(2025 - 10 - 05);
        let want_count = 20;
        for i in 1..=want_count {
            create_transaction(
                user_id,
                Transaction::build(i as f64, today, &format!("transaction {i}")),
                &conn,
            )
            .expect("Could not create transaction");
        }

        let got_count = count_transactions(user_id, &conn).expect("Could not get count");

        assert_eq!(want_count, got_count);
    }

    #[test]
    fn transaction_survives_a_serde_round_trip() {
        let conn = get_test_connection();
        let user_id = UserId::new(42);
        let transaction = create_transaction(
            user_id,
            Transaction::build(-50.0, date!(2024 - 07 - 01), "Mercado"),
            &conn,
        )
        .expect("Could not create transaction");

        let json = serde_json::to_string(&transaction).expect("Could not serialize");
        let got: crate::transaction::Transaction =
            serde_json::from_str(&json).expect("Could not deserialize");

        assert_eq!(transaction, got);
    }

    #[test]
    fn clear_removes_only_the_owners_transactions() {
        let conn = get_test_connection();
        let owner = UserId::new(1);
        let other = UserId::new(2);
        let today = date!(2025 - 10 - 05);
        create_transaction(owner, Transaction::build(-1.0, today, "a"), &conn).unwrap();
        create_transaction(owner, Transaction::build(-2.0, today, "b"), &conn).unwrap();
        create_transaction(other, Transaction::build(-3.0, today, "c"), &conn).unwrap();

        let removed = clear_transactions(owner, &conn).expect("Could not clear transactions");

        assert_eq!(removed, 2);
        assert_eq!(count_transactions(owner, &conn), Ok(0));
        assert_eq!(count_transactions(other, &conn), Ok(1));
    }
}
