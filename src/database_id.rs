//! Database ID type definitions.

use serde::{Deserialize, Serialize};

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseId = i64;
/// Database identifier for a transaction.
pub type TransactionId = i64;
/// Database identifier for a category.
pub type CategoryId = i64;
/// Database identifier for a budget.
pub type BudgetId = i64;
/// Database identifier for a goal.
pub type GoalId = i64;
/// Catalog identifier for an achievement definition, e.g. `"ach_8"`.
pub type AchievementId = &'static str;

/// The ID of the user that owns a set of records.
///
/// Authentication is delegated to an external identity provider, so there is
/// no user table in this database; the ID is an opaque reference to the
/// provider's subject. Every entity in the store is scoped to exactly one
/// user and queries never cross this boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(i64);

impl UserId {
    /// Create a user ID from the identity provider's numeric subject.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// The raw integer form used in database columns.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl rusqlite::ToSql for UserId {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        self.0.to_sql()
    }
}

impl rusqlite::types::FromSql for UserId {
    fn column_result(value: rusqlite::types::ValueRef<'_>) -> rusqlite::types::FromSqlResult<Self> {
        i64::column_result(value).map(UserId)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
