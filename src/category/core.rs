//! Core category domain types and database operations.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    database_id::{CategoryId, UserId},
};

/// A validated, non-empty category name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyCategoryName] if `name` is an empty string.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyCategoryName)
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Create a category name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    ///
    /// This function has `_unchecked` in the name but is not `unsafe`, because if the non-empty invariant is violated it will cause incorrect behaviour but not affect memory safety.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for CategoryName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CategoryName::new(s)
    }
}

impl Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user-defined spending category, e.g. "Mercado" or "Transporte".
///
/// The icon is an opaque symbolic name; resolving it to a renderable asset is
/// a UI concern and never happens in this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// The user that owns the category.
    pub user_id: UserId,
    /// The display name, unique per user.
    pub name: CategoryName,
    /// Symbolic icon name, e.g. "shopping-cart".
    pub icon: String,
    /// Display color, e.g. "#ff7a00".
    pub color: String,
}

/// Create a category and return it with its generated ID.
///
/// # Errors
/// This function will return a:
/// - [Error::DuplicateCategoryName] if the user already has a category with this name,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_category(
    user_id: UserId,
    name: CategoryName,
    icon: &str,
    color: &str,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .execute(
            "INSERT INTO category (user_id, name, icon, color) VALUES (?1, ?2, ?3, ?4);",
            (user_id, name.as_ref(), icon, color),
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicateCategoryName(name.to_string()),
            error => error.into(),
        })?;

    let id = connection.last_insert_rowid();

    Ok(Category {
        id,
        user_id,
        name,
        icon: icon.to_owned(),
        color: color.to_owned(),
    })
}

/// Retrieve a single category by ID.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `category_id` does not refer to a category owned by `user_id`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_category(
    user_id: UserId,
    category_id: CategoryId,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, icon, color FROM category
             WHERE user_id = :user_id AND id = :id;",
        )?
        .query_row(
            &[(":user_id", &user_id.as_i64()), (":id", &category_id)],
            map_category_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve all of a user's categories ordered alphabetically by name.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn list_categories(user_id: UserId, connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, icon, color FROM category
             WHERE user_id = :user_id ORDER BY name ASC;",
        )?
        .query_map(&[(":user_id", &user_id)], map_category_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Update a category's name, icon, and color.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingCategory] if the category doesn't exist,
/// - or [Error::DuplicateCategoryName] if the new name is taken,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_category(
    user_id: UserId,
    category_id: CategoryId,
    name: CategoryName,
    icon: &str,
    color: &str,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection
        .execute(
            "UPDATE category SET name = ?1, icon = ?2, color = ?3 WHERE user_id = ?4 AND id = ?5",
            (name.as_ref(), icon, color, user_id, category_id),
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicateCategoryName(name.to_string()),
            error => error.into(),
        })?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingCategory);
    }

    Ok(())
}

/// Delete a category by ID.
///
/// Transactions that referenced the category become uncategorized; they are
/// never deleted along with it.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingCategory] if the category doesn't exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_category(
    user_id: UserId,
    category_id: CategoryId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM category WHERE user_id = ?1 AND id = ?2",
        (user_id, category_id),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingCategory);
    }

    Ok(())
}

/// Initialize the category table and indexes.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            icon TEXT NOT NULL,
            color TEXT NOT NULL,
            UNIQUE(user_id, name)
        );

        CREATE INDEX IF NOT EXISTS idx_category_user ON category(user_id);",
    )?;

    Ok(())
}

fn map_category_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let id = row.get(0)?;
    let user_id = row.get(1)?;
    let raw_name: String = row.get(2)?;
    let icon = row.get(3)?;
    let color = row.get(4)?;

    Ok(Category {
        id,
        user_id,
        name: CategoryName::new_unchecked(&raw_name),
        icon,
        color,
    })
}

#[cfg(test)]
mod category_name_tests {
    use crate::{Error, category::CategoryName};

    #[test]
    fn new_fails_on_empty_string() {
        let name = CategoryName::new("");

        assert_eq!(name, Err(Error::EmptyCategoryName));
    }

    #[test]
    fn new_fails_on_just_whitespace() {
        let name = CategoryName::new("\n\t \r");

        assert_eq!(name, Err(Error::EmptyCategoryName));
    }

    #[test]
    fn new_succeeds_on_non_empty_string() {
        let name = CategoryName::new("🔥");

        assert!(name.is_ok())
    }
}

#[cfg(test)]
mod category_query_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        category::{
            CategoryName, create_category, delete_category, get_category, list_categories,
            update_category,
        },
        database_id::UserId,
        db::initialize,
        transaction::{Transaction, create_transaction, get_transaction, set_transaction_category},
    };

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
    }

    #[test]
    fn create_category_succeeds() {
        let connection = get_test_connection();
        let user_id = UserId::new(42);
        let name = CategoryName::new("Mercado").unwrap();

        let category = create_category(user_id, name.clone(), "shopping-cart", "#ff7a00", &connection);

        let got = category.expect("Could not create category");
        assert!(got.id > 0);
        assert_eq!(got.name, name);
        assert_eq!(got.icon, "shopping-cart");
        assert_eq!(got.color, "#ff7a00");
    }

    #[test]
    fn create_fails_on_duplicate_name_for_the_same_user() {
        let connection = get_test_connection();
        let user_id = UserId::new(42);
        create_category(
            user_id,
            CategoryName::new_unchecked("Mercado"),
            "shopping-cart",
            "#ff7a00",
            &connection,
        )
        .expect("Could not create category");

        let duplicate = create_category(
            user_id,
            CategoryName::new_unchecked("Mercado"),
            "store",
            "#00ff00",
            &connection,
        );

        assert_eq!(
            duplicate,
            Err(Error::DuplicateCategoryName("Mercado".to_owned()))
        );
    }

    #[test]
    fn same_name_is_allowed_across_users() {
        let connection = get_test_connection();
        create_category(
            UserId::new(1),
            CategoryName::new_unchecked("Mercado"),
            "shopping-cart",
            "#ff7a00",
            &connection,
        )
        .expect("Could not create category");

        let other = create_category(
            UserId::new(2),
            CategoryName::new_unchecked("Mercado"),
            "shopping-cart",
            "#ff7a00",
            &connection,
        );

        assert!(other.is_ok(), "want category created, got {other:?}");
    }

    #[test]
    fn get_category_succeeds() {
        let connection = get_test_connection();
        let user_id = UserId::new(42);
        let inserted = create_category(
            user_id,
            CategoryName::new_unchecked("Lazer"),
            "gamepad",
            "#3366ff",
            &connection,
        )
        .expect("Could not create test category");

        let selected = get_category(user_id, inserted.id, &connection);

        assert_eq!(Ok(inserted), selected);
    }

    #[test]
    fn get_category_with_invalid_id_returns_not_found() {
        let connection = get_test_connection();
        let user_id = UserId::new(42);
        let inserted = create_category(
            user_id,
            CategoryName::new_unchecked("Lazer"),
            "gamepad",
            "#3366ff",
            &connection,
        )
        .expect("Could not create test category");

        let selected = get_category(user_id, inserted.id + 123, &connection);

        assert_eq!(selected, Err(Error::NotFound));
    }

    #[test]
    fn list_returns_categories_in_alphabetical_order() {
        let connection = get_test_connection();
        let user_id = UserId::new(42);
        for name in ["Transporte", "Alimentação", "Lazer"] {
            create_category(
                user_id,
                CategoryName::new_unchecked(name),
                "tag",
                "#cccccc",
                &connection,
            )
            .expect("Could not create test category");
        }

        let got = list_categories(user_id, &connection).expect("Could not list categories");

        let names: Vec<&str> = got.iter().map(|category| category.name.as_ref()).collect();
        assert_eq!(names, vec!["Alimentação", "Lazer", "Transporte"]);
    }

    #[test]
    fn update_category_succeeds() {
        let connection = get_test_connection();
        let user_id = UserId::new(42);
        let inserted = create_category(
            user_id,
            CategoryName::new_unchecked("Lazer"),
            "gamepad",
            "#3366ff",
            &connection,
        )
        .expect("Could not create test category");

        update_category(
            user_id,
            inserted.id,
            CategoryName::new_unchecked("Entretenimento"),
            "film",
            "#9933cc",
            &connection,
        )
        .expect("Could not update category");

        let got = get_category(user_id, inserted.id, &connection).expect("Could not get category");
        assert_eq!(got.name.as_ref(), "Entretenimento");
        assert_eq!(got.icon, "film");
    }

    #[test]
    fn update_missing_category_fails() {
        let connection = get_test_connection();

        let result = update_category(
            UserId::new(42),
            999,
            CategoryName::new_unchecked("Nada"),
            "tag",
            "#cccccc",
            &connection,
        );

        assert_eq!(result, Err(Error::UpdateMissingCategory));
    }

    #[test]
    fn delete_missing_category_fails() {
        let connection = get_test_connection();

        let result = delete_category(UserId::new(42), 999, &connection);

        assert_eq!(result, Err(Error::DeleteMissingCategory));
    }

    #[test]
    fn deleting_a_category_uncategorizes_its_transactions() {
        let connection = get_test_connection();
        let user_id = UserId::new(42);
        let category = create_category(
            user_id,
            CategoryName::new_unchecked("Mercado"),
            "shopping-cart",
            "#ff7a00",
            &connection,
        )
        .expect("Could not create category");
        let transaction = create_transaction(
            user_id,
            Transaction::build(-50.0, date!(2024 - 07 - 01), "Mercado"),
            &connection,
        )
        .expect("Could not create transaction");
        set_transaction_category(user_id, transaction.id, Some(category.id), &connection)
            .expect("Could not set category");

        delete_category(user_id, category.id, &connection).expect("Could not delete category");

        let got = get_transaction(user_id, transaction.id, &connection)
            .expect("Transaction should survive category deletion");
        assert_eq!(got.category_id, None);
    }
}
