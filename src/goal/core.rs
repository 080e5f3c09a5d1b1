//! Savings goal model and database operations.

use rusqlite::{
    Connection, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    database_id::{GoalId, UserId},
};

/// Where a goal is in its lifecycle.
///
/// `InProgress` goals complete when their saved amount reaches the target;
/// they fail when a caller-driven sweep finds their deadline has passed.
/// Both `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoalStatus {
    /// Still being saved towards.
    InProgress,
    /// The saved amount reached the target.
    Completed,
    /// The deadline passed before the target was reached.
    Failed,
}

impl GoalStatus {
    /// The wire form stored in the database, e.g. `"in-progress"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalStatus::InProgress => "in-progress",
            GoalStatus::Completed => "completed",
            GoalStatus::Failed => "failed",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "in-progress" => Some(GoalStatus::InProgress),
            "completed" => Some(GoalStatus::Completed),
            "failed" => Some(GoalStatus::Failed),
            _ => None,
        }
    }
}

impl rusqlite::ToSql for GoalStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for GoalStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        GoalStatus::parse(text).ok_or(FromSqlError::InvalidType)
    }
}

/// A savings goal, e.g. "Viagem para a praia" with a target of R$ 5000.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    /// The ID of the goal.
    pub id: GoalId,
    /// The user that owns the goal.
    pub user_id: UserId,
    /// What the user is saving for.
    pub title: String,
    /// How much needs to be saved.
    pub target_amount: f64,
    /// How much has been saved so far.
    pub saved_amount: f64,
    /// The date the goal should be reached by.
    pub deadline: Date,
    /// Where the goal is in its lifecycle.
    pub status: GoalStatus,
    /// The date the goal was created.
    pub created_at: Date,
}

/// Create a goal and return it with its generated ID.
///
/// New goals start in progress with nothing saved. `created_at` is supplied
/// by the caller; this core never reads the wall clock.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn create_goal(
    user_id: UserId,
    title: &str,
    target_amount: f64,
    deadline: Date,
    created_at: Date,
    connection: &Connection,
) -> Result<Goal, Error> {
    connection
        .prepare(
            "INSERT INTO goal (user_id, title, target_amount, saved_amount, deadline, status, created_at)
             VALUES (?1, ?2, ?3, 0, ?4, ?5, ?6)
             RETURNING id, user_id, title, target_amount, saved_amount, deadline, status, created_at",
        )?
        .query_row(
            (
                user_id,
                title,
                target_amount,
                deadline,
                GoalStatus::InProgress,
                created_at,
            ),
            map_goal_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve a single goal by ID.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `goal_id` does not refer to a goal owned by `user_id`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_goal(user_id: UserId, goal_id: GoalId, connection: &Connection) -> Result<Goal, Error> {
    connection
        .prepare(
            "SELECT id, user_id, title, target_amount, saved_amount, deadline, status, created_at
             FROM goal WHERE user_id = :user_id AND id = :id;",
        )?
        .query_row(
            &[(":user_id", &user_id.as_i64()), (":id", &goal_id)],
            map_goal_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve all of a user's goals, oldest first.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn list_goals(user_id: UserId, connection: &Connection) -> Result<Vec<Goal>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, title, target_amount, saved_amount, deadline, status, created_at
             FROM goal WHERE user_id = :user_id ORDER BY created_at ASC, id ASC;",
        )?
        .query_map(&[(":user_id", &user_id)], map_goal_row)?
        .map(|maybe_goal| maybe_goal.map_err(|error| error.into()))
        .collect()
}

/// Update a goal's title, target amount, and deadline.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingGoal] if the goal doesn't exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_goal(
    user_id: UserId,
    goal_id: GoalId,
    title: &str,
    target_amount: f64,
    deadline: Date,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE goal SET title = ?1, target_amount = ?2, deadline = ?3
         WHERE user_id = ?4 AND id = ?5",
        (title, target_amount, deadline, user_id, goal_id),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingGoal);
    }

    Ok(())
}

/// Delete a goal by ID.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingGoal] if the goal doesn't exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_goal(user_id: UserId, goal_id: GoalId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM goal WHERE user_id = ?1 AND id = ?2",
        (user_id, goal_id),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingGoal);
    }

    Ok(())
}

/// Add a contribution to a goal and return its updated state.
///
/// When the saved amount reaches the target, an in-progress goal completes.
/// Completion is terminal; contributing more to a completed goal only grows
/// the saved amount.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidContribution] if `amount` is not a positive, finite number,
/// - or [Error::NotFound] if the goal doesn't exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn add_contribution(
    user_id: UserId,
    goal_id: GoalId,
    amount: f64,
    connection: &Connection,
) -> Result<Goal, Error> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidContribution(amount));
    }

    let goal = get_goal(user_id, goal_id, connection)?;

    let saved_amount = goal.saved_amount + amount;
    let status = if goal.status == GoalStatus::InProgress && saved_amount >= goal.target_amount {
        GoalStatus::Completed
    } else {
        goal.status
    };

    connection.execute(
        "UPDATE goal SET saved_amount = ?1, status = ?2 WHERE user_id = ?3 AND id = ?4",
        (saved_amount, status, user_id, goal_id),
    )?;

    Ok(Goal {
        saved_amount,
        status,
        ..goal
    })
}

/// Fail every in-progress goal whose deadline has passed.
///
/// This is the caller-driven half of the goal state machine: nothing in the
/// core watches the clock, so the application runs this sweep with its idea
/// of `today`. Returns how many goals were failed.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn sweep_overdue_goals(
    user_id: UserId,
    today: Date,
    connection: &Connection,
) -> Result<usize, Error> {
    connection
        .execute(
            "UPDATE goal SET status = ?1 WHERE user_id = ?2 AND status = ?3 AND deadline < ?4",
            (GoalStatus::Failed, user_id, GoalStatus::InProgress, today),
        )
        .map_err(|error| error.into())
}

/// Initialize the goal table and indexes.
pub fn create_goal_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS goal (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            target_amount REAL NOT NULL,
            saved_amount REAL NOT NULL DEFAULT 0,
            deadline TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'in-progress',
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_goal_user ON goal(user_id);",
    )?;

    Ok(())
}

fn map_goal_row(row: &Row) -> Result<Goal, rusqlite::Error> {
    let id = row.get(0)?;
    let user_id = row.get(1)?;
    let title = row.get(2)?;
    let target_amount = row.get(3)?;
    let saved_amount = row.get(4)?;
    let deadline = row.get(5)?;
    let status = row.get(6)?;
    let created_at = row.get(7)?;

    Ok(Goal {
        id,
        user_id,
        title,
        target_amount,
        saved_amount,
        deadline,
        status,
        created_at,
    })
}
