//! Unlock records: durable evidence that a user earned an achievement.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{Error, database_id::{DatabaseId, UserId}};

/// A record of one achievement unlocked by one user.
///
/// At most one record exists per `(user, achievement)`; unlocked is a
/// terminal state and recording it again is a no-op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAchievement {
    /// The ID of the unlock record.
    pub id: DatabaseId,
    /// The user that earned the achievement.
    pub user_id: UserId,
    /// The catalog ID of the earned achievement, e.g. `"ach_8"`.
    pub achievement_id: String,
    /// The date the achievement was first unlocked.
    pub unlocked_at: Date,
}

/// Record that a user unlocked an achievement.
///
/// Safe to call when the achievement is already unlocked: the existing
/// record is returned unchanged, with its original unlock date.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn record_unlock(
    user_id: UserId,
    achievement_id: &str,
    unlocked_at: Date,
    connection: &Connection,
) -> Result<UserAchievement, Error> {
    let inserted = connection
        .prepare(
            "INSERT INTO user_achievement (user_id, achievement_id, unlocked_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id, achievement_id) DO NOTHING
             RETURNING id, user_id, achievement_id, unlocked_at",
        )?
        .query_row((user_id, achievement_id, unlocked_at), map_unlock_row);

    match inserted {
        Ok(unlock) => Ok(unlock),
        // No row returned means the unlock already existed; fetch it so the
        // caller sees the original unlock date.
        Err(rusqlite::Error::QueryReturnedNoRows) => connection
            .prepare(
                "SELECT id, user_id, achievement_id, unlocked_at FROM user_achievement
                 WHERE user_id = ?1 AND achievement_id = ?2",
            )?
            .query_row((user_id, achievement_id), map_unlock_row)
            .map_err(Error::from),
        Err(error) => Err(Error::from(error)),
    }
}

/// Retrieve all of a user's unlock records, oldest first.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn list_unlocked_achievements(
    user_id: UserId,
    connection: &Connection,
) -> Result<Vec<UserAchievement>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, achievement_id, unlocked_at FROM user_achievement
             WHERE user_id = :user_id ORDER BY id ASC;",
        )?
        .query_map(&[(":user_id", &user_id)], map_unlock_row)?
        .map(|maybe_unlock| maybe_unlock.map_err(|error| error.into()))
        .collect()
}

/// Initialize the unlock record table.
pub fn create_user_achievement_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS user_achievement (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            achievement_id TEXT NOT NULL,
            unlocked_at TEXT NOT NULL,
            UNIQUE(user_id, achievement_id)
        );",
    )?;

    Ok(())
}

fn map_unlock_row(row: &Row) -> Result<UserAchievement, rusqlite::Error> {
    let id = row.get(0)?;
    let user_id = row.get(1)?;
    let achievement_id = row.get(2)?;
    let unlocked_at = row.get(3)?;

    Ok(UserAchievement {
        id,
        user_id,
        achievement_id,
        unlocked_at,
    })
}
