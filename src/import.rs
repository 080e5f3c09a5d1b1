//! Statement import orchestration: parse the raw export, then merge the
//! normalized rows into the user's transaction set.

use rusqlite::Connection;

use crate::{
    Error,
    database_id::UserId,
    statement::{FormatHint, parse_statement},
    transaction::{Transaction, merge_new},
};

/// The result of importing one statement for one user.
#[derive(Debug, PartialEq)]
pub struct ImportOutcome {
    /// How many usable rows the statement parsed into.
    pub parsed: usize,
    /// The transactions actually inserted, in statement order.
    pub imported: Vec<Transaction>,
    /// How many rows were already present from an earlier import.
    pub duplicates: usize,
    /// How many rows the parser dropped as malformed.
    pub skipped_rows: usize,
    /// How many rows were parsed but not persisted because their date could
    /// not be normalized to ISO form.
    pub skipped_dates: usize,
}

impl ImportOutcome {
    /// True when the statement parsed but contained nothing recognizable as
    /// a transaction. Distinct from a parse error: the caller decides
    /// whether to warn or treat it as a successful import of zero rows.
    pub fn nothing_recognized(&self) -> bool {
        self.parsed == 0
    }
}

/// Parse a statement export and merge its rows into a user's transactions.
///
/// Re-importing the same statement (in full or overlapping part) never
/// creates duplicate records: rows are fingerprinted over their normalized
/// content and merged against the authoritative store.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidStatement] if no parsing strategy recognizes the file;
///   nothing is imported in that case,
/// - or [Error::SqlError] if there is some SQL error.
pub fn import_statement(
    text: &str,
    user_id: UserId,
    hint: Option<FormatHint>,
    connection: &Connection,
) -> Result<ImportOutcome, Error> {
    let parse_outcome = parse_statement(text, hint)?;

    if parse_outcome.nothing_recognized() {
        tracing::debug!(
            "Statement for user {user_id} contained no usable rows ({} skipped)",
            parse_outcome.skipped
        );

        return Ok(ImportOutcome {
            parsed: 0,
            imported: Vec::new(),
            duplicates: 0,
            skipped_rows: parse_outcome.skipped,
            skipped_dates: 0,
        });
    }

    let merge_outcome = merge_new(user_id, &parse_outcome.rows, connection)?;

    tracing::info!(
        "Imported {} transactions for user {user_id} ({} duplicates, {} malformed rows, {} unnormalized dates)",
        merge_outcome.imported.len(),
        merge_outcome.duplicates,
        parse_outcome.skipped,
        merge_outcome.skipped_dates,
    );

    Ok(ImportOutcome {
        parsed: parse_outcome.rows.len(),
        imported: merge_outcome.imported,
        duplicates: merge_outcome.duplicates,
        skipped_rows: parse_outcome.skipped,
        skipped_dates: merge_outcome.skipped_dates,
    })
}
