//! Statement ingestion: parsing bank exports into normalized rows.
//!
//! This module contains the pure half of the import pipeline:
//! - per-bank parsing strategies and the generic heuristic strategy
//! - date and amount normalization
//! - the content fingerprint used by the deduplicating merge

mod csv;
mod fingerprint;

pub use self::csv::{
    FormatHint, ParseOutcome, ParsedRow, RawRecord, normalize_rows, parse_statement,
};
pub use self::fingerprint::fingerprint;
