//! Deduplicating merge of parsed statement rows into the transaction store.
//!
//! The merge partitions a batch by fingerprint membership against the
//! authoritative store at merge time, then inserts only the new partition.
//! The insert carries an `ON CONFLICT DO NOTHING` backstop on the
//! `(user_id, fingerprint)` uniqueness constraint, so two overlapping imports
//! racing between the membership check and the insert resolve to "already
//! present" instead of an error.

use std::collections::HashSet;

use rusqlite::Connection;
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    Error,
    database_id::UserId,
    statement::ParsedRow,
    transaction::{Transaction, map_transaction_row},
};

/// How many fingerprints a single membership query carries.
///
/// The merge result must not depend on this number; it only bounds the
/// parameter count of each `IN (...)` query.
const FINGERPRINT_CHUNK_SIZE: usize = 30;

const ISO_DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// The result of merging a batch of parsed rows into a user's transactions.
#[derive(Debug, PartialEq)]
pub struct MergeOutcome {
    /// The transactions that were actually inserted, in batch order.
    pub imported: Vec<Transaction>,
    /// How many rows were already present (same fingerprint) and skipped.
    pub duplicates: usize,
    /// How many rows were not persisted because their date could not be
    /// normalized to ISO form. Stored dates are always `YYYY-MM-DD`.
    pub skipped_dates: usize,
}

/// Returns which of the given fingerprints already exist for this user.
///
/// The query is chunked so that no single statement carries more than
/// [FINGERPRINT_CHUNK_SIZE] parameters; the partial results are unioned.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn existing_fingerprints(
    user_id: UserId,
    fingerprints: &[i64],
    connection: &Connection,
) -> Result<HashSet<i64>, Error> {
    let mut existing = HashSet::new();

    for chunk in fingerprints.chunks(FINGERPRINT_CHUNK_SIZE) {
        let placeholders = vec!["?"; chunk.len()].join(", ");
        let sql = format!(
            "SELECT fingerprint FROM \"transaction\"
             WHERE user_id = ? AND fingerprint IN ({placeholders})"
        );

        let mut statement = connection.prepare(&sql)?;
        let parameters = std::iter::once(user_id.as_i64()).chain(chunk.iter().copied());
        let rows = statement.query_map(rusqlite::params_from_iter(parameters), |row| {
            row.get::<_, i64>(0)
        })?;

        for fingerprint in rows {
            existing.insert(fingerprint?);
        }
    }

    Ok(existing)
}

/// Merge a batch of parsed statement rows into a user's transaction set.
///
/// Rows whose fingerprint is already stored are filtered out transparently;
/// the caller receives only the genuinely new records. Importing the same
/// statement twice therefore leaves the store unchanged the second time.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn merge_new(
    user_id: UserId,
    rows: &[ParsedRow],
    connection: &Connection,
) -> Result<MergeOutcome, Error> {
    let fingerprints: Vec<i64> = rows.iter().map(|row| row.fingerprint).collect();
    let existing = existing_fingerprints(user_id, &fingerprints, connection)?;

    let mut imported = Vec::new();
    let mut duplicates = 0;
    let mut skipped_dates = 0;

    let mut statement = connection.prepare(
        "INSERT INTO \"transaction\" (user_id, amount, date, description, fingerprint, category_id)
         VALUES (?1, ?2, ?3, ?4, ?5, NULL)
         ON CONFLICT(user_id, fingerprint) DO NOTHING
         RETURNING id, user_id, amount, date, description, fingerprint, category_id",
    )?;

    for row in rows {
        if existing.contains(&row.fingerprint) {
            duplicates += 1;
            continue;
        }

        if !row.date_normalized {
            tracing::debug!(
                "Not persisting row with unnormalized date '{}': {}",
                row.date,
                row.description
            );
            skipped_dates += 1;
            continue;
        }

        let date = parse_iso_date(&row.date)?;

        let insert_result = statement.query_row(
            (user_id, row.amount, date, &row.description, row.fingerprint),
            map_transaction_row,
        );

        match insert_result {
            Ok(transaction) => imported.push(transaction),
            // The row appeared after the membership check, either earlier in
            // this batch or from a concurrent import. The uniqueness backstop
            // turned the insert into a no-op.
            Err(rusqlite::Error::QueryReturnedNoRows) => duplicates += 1,
            Err(error) => return Err(error.into()),
        }
    }

    Ok(MergeOutcome {
        imported,
        duplicates,
        skipped_dates,
    })
}

fn parse_iso_date(raw: &str) -> Result<Date, Error> {
    Date::parse(raw, &ISO_DATE_FORMAT).map_err(|_| Error::InvalidDate(raw.to_owned()))
}
