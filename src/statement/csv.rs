//! Parsers for bank statement exports.
//!
//! Each recognized export format gets its own normalization strategy; a
//! generic heuristic strategy handles everything else. All strategies feed
//! their rows through the same normalization ([normalize_rows]) so that
//! dates, amounts, and fingerprints come out identical no matter which path
//! produced them. The AI-assisted parser (an external collaborator) re-enters
//! the pipeline through [normalize_rows] as well.

use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::{Error, statement::fingerprint};

/// A single normalized statement row, ready for the deduplicating merge.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    /// The transaction date as ISO `YYYY-MM-DD`, or the raw source text when
    /// the date matched none of the supported patterns (see
    /// [ParsedRow::date_normalized]).
    pub date: String,
    /// A text description of what the transaction was for.
    pub description: String,
    /// The amount of money spent (negative) or earned (positive).
    pub amount: f64,
    /// Content fingerprint over `(date, description, amount)`, used to skip
    /// duplicates on repeated uploads.
    pub fingerprint: i64,
    /// Whether the date was normalized to ISO form. Rows with `false` here
    /// are low-confidence: the date text was passed through unchanged and the
    /// merge will not persist them.
    pub date_normalized: bool,
}

/// The rows found after parsing a statement.
///
/// Zero rows is a valid outcome and distinct from a parse error: the file was
/// readable but contained nothing recognizable as a transaction.
#[derive(Debug, Default, PartialEq)]
pub struct ParseOutcome {
    /// The normalized rows, in statement order.
    pub rows: Vec<ParsedRow>,
    /// How many rows were dropped because their date, description, or amount
    /// was unusable. Malformed rows never fail the batch.
    pub skipped: usize,
}

impl ParseOutcome {
    /// True when parsing succeeded but no usable row was found.
    pub fn nothing_recognized(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A raw `(date, description, amount)` triple extracted from a statement row
/// before normalization.
///
/// This is also the re-entry point for rows produced outside the CSV
/// strategies, e.g. by the AI-assisted parser.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// The date text exactly as it appeared in the source.
    pub date: String,
    /// The description text as it appeared in the source.
    pub description: String,
    /// The signed amount; negative for expenses.
    pub amount: f64,
}

/// An optional caller-supplied hint naming the bank export format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatHint {
    /// A C6 Bank account export.
    C6Bank,
    /// Any delimited export with a recognizable header row.
    Generic,
}

/// Parses the raw text of a bank statement export.
///
/// Tries each normalization strategy in turn unless `hint` names one.
///
/// Returns a [ParseOutcome] with the normalized rows (possibly empty) or
/// [Error::InvalidStatement] if no strategy could make sense of the file at
/// all. Individual malformed rows are skipped and counted, never fatal.
pub fn parse_statement(text: &str, hint: Option<FormatHint>) -> Result<ParseOutcome, Error> {
    match hint {
        Some(FormatHint::C6Bank) => return parse_c6_statement(text),
        Some(FormatHint::Generic) => return parse_delimited_statement(text),
        None => {}
    }

    match parse_c6_statement(text) {
        Ok(outcome) if !outcome.rows.is_empty() => return Ok(outcome),
        Ok(outcome) => {
            // The file carried a C6-looking header but no usable C6 rows;
            // give the generic strategy a chance before reporting an empty
            // result.
            return Ok(parse_delimited_statement(text).unwrap_or(outcome));
        }
        Err(error) => {
            tracing::debug!("Could not parse statement as a C6 Bank export: {error}");
        }
    }

    parse_delimited_statement(text)
}

/// Parses a C6 Bank account export.
///
/// The export starts with free-form bank and account information, then a
/// header line:
///
/// ```text
/// Data Lançamento,Data Contábil,Título,Descrição,Entrada(R$),Saída(R$),Saldo do Dia(R$)
/// ```
///
/// Everything before the header is preamble and discarded. The description
/// is the `Título` column; the amount is the `Entrada` value when present,
/// otherwise the negated `Saída` value.
fn parse_c6_statement(text: &str) -> Result<ParseOutcome, Error> {
    const HEADER_PREFIX: &str = "Data Lançamento";
    const DATE_COLUMN: usize = 0;
    const TITLE_COLUMN: usize = 2;
    const CREDIT_COLUMN: usize = 4;
    const DEBIT_COLUMN: usize = 5;
    const COLUMN_COUNT: usize = 7;

    let lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();

    let header_index = lines
        .iter()
        .position(|line| line.trim_start().starts_with(HEADER_PREFIX))
        .ok_or_else(|| {
            Error::InvalidStatement(format!(
                "C6 Bank statement missing header line starting with '{HEADER_PREFIX}'"
            ))
        })?;

    let mut records = Vec::new();
    let mut skipped = 0;

    for (reader_record, line_number) in read_records(&lines[header_index + 1..], b',') {
        let record = match reader_record {
            Ok(record) => record,
            Err(error) => {
                tracing::debug!("Skipping unreadable statement row {line_number}: {error}");
                skipped += 1;
                continue;
            }
        };

        if record.len() < COLUMN_COUNT {
            skipped += 1;
            continue;
        }

        let date = record[DATE_COLUMN].trim();
        let title = record[TITLE_COLUMN].trim();

        if date.is_empty() || title.is_empty() {
            skipped += 1;
            continue;
        }

        let credit = parse_decimal(&record[CREDIT_COLUMN]).unwrap_or(0.0);
        let debit = parse_decimal(&record[DEBIT_COLUMN]).unwrap_or(0.0);
        let amount = if credit > 0.0 { credit } else { -debit.abs() };

        records.push(RawRecord {
            date: date.to_owned(),
            description: title.to_owned(),
            amount,
        });
    }

    let mut outcome = normalize_rows(records);
    outcome.skipped += skipped;

    Ok(outcome)
}

/// Header tokens recognized as the date column.
const DATE_HEADERS: &[&str] = &[
    "data",
    "data lançamento",
    "data lancamento",
    "data movimento",
    "date",
    "dt",
];

/// Header tokens recognized as description candidates. A statement may have
/// several; the most informative (longest non-empty) value wins per row.
const DESCRIPTION_HEADERS: &[&str] = &[
    "descrição",
    "descricao",
    "description",
    "título",
    "titulo",
    "histórico",
    "historico",
    "lançamento",
    "lancamento",
    "memo",
    "payee",
    "detalhes",
];

/// Header tokens recognized as a single signed amount column.
const AMOUNT_HEADERS: &[&str] = &["valor", "amount", "value", "montante"];

/// Header tokens recognized as the income half of a split amount pair.
const CREDIT_HEADERS: &[&str] = &["entrada", "entradas", "crédito", "credito", "credit", "income"];

/// Header tokens recognized as the expense half of a split amount pair.
const DEBIT_HEADERS: &[&str] = &["saída", "saida", "saídas", "saidas", "débito", "debito", "debit", "expense"];

/// Which columns carry the amount in a recognized header.
enum AmountColumns {
    /// One signed column.
    Single(usize),
    /// Separate income and expense columns, combined as `credit - |debit|`.
    Split { credit: usize, debit: usize },
}

/// The semantic columns extracted from a header row.
struct ColumnMap {
    date: usize,
    descriptions: Vec<usize>,
    amount: AmountColumns,
}

impl ColumnMap {
    /// The highest column index the map reads, for cheap row-length checks.
    fn max_index(&self) -> usize {
        let amount_max = match self.amount {
            AmountColumns::Single(index) => index,
            AmountColumns::Split { credit, debit } => credit.max(debit),
        };

        self.descriptions
            .iter()
            .copied()
            .chain([self.date, amount_max])
            .max()
            .unwrap_or(0)
    }
}

/// Parses any delimited export with a recognizable header row.
///
/// Scans for the first line whose fields match the known header tokens for a
/// date, a description, and an amount (either a single signed column or an
/// income/expense pair); preceding lines are preamble. If no line matches,
/// row 0 is assumed to be the header and the columns are mapped by position:
/// date first, amount last, description from the columns in between.
///
/// Returns [Error::InvalidStatement] when no delimiter occurs anywhere in
/// the file or the header cannot be mapped to the three semantic fields.
fn parse_delimited_statement(text: &str) -> Result<ParseOutcome, Error> {
    let lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();

    if lines.is_empty() {
        return Err(Error::InvalidStatement("the statement is empty".to_owned()));
    }

    let delimiter = detect_delimiter(&lines).ok_or_else(|| {
        Error::InvalidStatement("no field delimiter found anywhere in the statement".to_owned())
    })?;

    let mut header = None;

    for (index, line) in lines.iter().enumerate() {
        let Some(fields) = split_line(line, delimiter) else {
            continue;
        };
        let normalized: Vec<String> = fields.iter().map(|field| normalize_header_field(field)).collect();

        if let Some(columns) = recognize_header(&normalized) {
            header = Some((index, columns));
            break;
        }
    }

    let (header_index, columns) = match header {
        Some(found) => found,
        None => (0, positional_columns(lines[0], delimiter)?),
    };

    let mut records = Vec::new();
    let mut skipped = 0;

    for (reader_record, line_number) in read_records(&lines[header_index + 1..], delimiter) {
        let record = match reader_record {
            Ok(record) => record,
            Err(error) => {
                tracing::debug!("Skipping unreadable statement row {line_number}: {error}");
                skipped += 1;
                continue;
            }
        };

        if record.len() <= columns.max_index() {
            skipped += 1;
            continue;
        }

        let date = record[columns.date].trim();

        let description = columns
            .descriptions
            .iter()
            .map(|&index| record[index].trim())
            .filter(|value| !value.is_empty())
            .max_by_key(|value| value.chars().count())
            .unwrap_or("");

        if date.is_empty() || description.is_empty() {
            skipped += 1;
            continue;
        }

        let amount = match columns.amount {
            AmountColumns::Single(index) => match parse_decimal(&record[index]) {
                Some(amount) => amount,
                None => {
                    skipped += 1;
                    continue;
                }
            },
            AmountColumns::Split { credit, debit } => {
                let credit_amount = parse_decimal(&record[credit]).unwrap_or(0.0);
                let debit_amount = parse_decimal(&record[debit]).unwrap_or(0.0);
                credit_amount - debit_amount.abs()
            }
        };

        records.push(RawRecord {
            date: date.to_owned(),
            description: description.to_owned(),
            amount,
        });
    }

    let mut outcome = normalize_rows(records);
    outcome.skipped += skipped;

    Ok(outcome)
}

/// Normalizes raw `(date, description, amount)` triples into [ParsedRow]s.
///
/// This is the single normalization point shared by every parse path:
/// - dates are normalized to ISO `YYYY-MM-DD` from `DD/MM/YYYY`,
///   `DD-MM-YYYY`, `YYYY-MM-DD`, or `YYYY/MM/DD`; text matching none of the
///   patterns is passed through unchanged and the row flagged,
/// - rows with an empty description, an empty date, or a non-finite amount
///   are dropped and counted,
/// - each surviving row gets its content fingerprint.
pub fn normalize_rows(records: Vec<RawRecord>) -> ParseOutcome {
    let mut rows = Vec::new();
    let mut skipped = 0;

    for record in records {
        let description = record.description.trim().to_owned();
        let raw_date = record.date.trim();

        if description.is_empty() || raw_date.is_empty() || !record.amount.is_finite() {
            skipped += 1;
            continue;
        }

        let (date, date_normalized) = match normalize_date(raw_date) {
            Some(iso) => (iso, true),
            None => (raw_date.to_owned(), false),
        };

        let fingerprint = fingerprint(&date, &description, record.amount);

        rows.push(ParsedRow {
            date,
            description,
            amount: record.amount,
            fingerprint,
            date_normalized,
        });
    }

    ParseOutcome { rows, skipped }
}

/// The date patterns accepted by [normalize_date], tried in order.
const DATE_FORMATS: &[&[BorrowedFormatItem]] = &[
    format_description!("[day]/[month]/[year]"),
    format_description!("[day]-[month]-[year]"),
    format_description!("[year]-[month]-[day]"),
    format_description!("[year]/[month]/[day]"),
];

/// Normalizes a date string to ISO `YYYY-MM-DD`, or `None` if it matches no
/// supported pattern.
fn normalize_date(raw: &str) -> Option<String> {
    for format in DATE_FORMATS {
        if let Ok(date) = Date::parse(raw, format) {
            return Some(format!(
                "{:04}-{:02}-{:02}",
                date.year(),
                u8::from(date.month()),
                date.day()
            ));
        }
    }

    None
}

/// Parses a decimal amount, normalizing locale conventions first.
///
/// A comma acting as the decimal separator is converted to dot notation, so
/// `"1.234,56"` parses as `1234.56` and `"-50,00"` as `-50.0`. A dot-decimal
/// value with comma thousands separators (`"1,234.56"`) also parses. Returns
/// `None` for empty or non-numeric text and non-finite results.
fn parse_decimal(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().trim_start_matches("R$").trim();

    if cleaned.is_empty() {
        return None;
    }

    let normalized = match (cleaned.rfind('.'), cleaned.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (None, Some(_)) => cleaned.replace(',', "."),
        _ => cleaned.to_owned(),
    };

    normalized
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite())
}

/// Picks the field delimiter by counting candidates across the whole file.
/// Returns `None` when neither delimiter occurs anywhere.
fn detect_delimiter(lines: &[&str]) -> Option<u8> {
    let commas: usize = lines.iter().map(|line| line.matches(',').count()).sum();
    let semicolons: usize = lines.iter().map(|line| line.matches(';').count()).sum();

    if commas == 0 && semicolons == 0 {
        return None;
    }

    if semicolons > commas { Some(b';') } else { Some(b',') }
}

/// Lowercases a header field and strips any trailing parenthetical, so
/// `"Entrada(R$)"` and `"entrada"` compare equal.
fn normalize_header_field(field: &str) -> String {
    let field = match field.find('(') {
        Some(position) => &field[..position],
        None => field,
    };

    field.trim().trim_matches('"').to_lowercase()
}

/// Maps normalized header fields to semantic columns, or `None` when the
/// line does not look like a header.
fn recognize_header(fields: &[String]) -> Option<ColumnMap> {
    let position_of = |candidates: &[&str]| {
        fields
            .iter()
            .position(|field| candidates.contains(&field.as_str()))
    };

    let date = position_of(DATE_HEADERS)?;

    let descriptions: Vec<usize> = fields
        .iter()
        .enumerate()
        .filter(|(_, field)| DESCRIPTION_HEADERS.contains(&field.as_str()))
        .map(|(index, _)| index)
        .collect();

    if descriptions.is_empty() {
        return None;
    }

    let amount = match position_of(AMOUNT_HEADERS) {
        Some(index) => AmountColumns::Single(index),
        None => AmountColumns::Split {
            credit: position_of(CREDIT_HEADERS)?,
            debit: position_of(DEBIT_HEADERS)?,
        },
    };

    Some(ColumnMap {
        date,
        descriptions,
        amount,
    })
}

/// Positional fallback used when no header signature is recognized: row 0 is
/// the header, the first column is the date, the last is the amount, and the
/// columns in between are description candidates.
fn positional_columns(header_line: &str, delimiter: u8) -> Result<ColumnMap, Error> {
    let fields = split_line(header_line, delimiter).unwrap_or_default();

    if fields.len() < 3 {
        return Err(Error::InvalidStatement(
            "could not find a recognizable header row in the statement".to_owned(),
        ));
    }

    Ok(ColumnMap {
        date: 0,
        descriptions: (1..fields.len() - 1).collect(),
        amount: AmountColumns::Single(fields.len() - 1),
    })
}

/// Splits a single line into fields, respecting quoted fields that contain
/// the delimiter and doubled-quote escapes.
fn split_line(line: &str, delimiter: u8) -> Option<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(line.as_bytes());

    let record = reader.records().next()?.ok()?;

    Some(record.iter().map(|field| field.to_owned()).collect())
}

/// Reads the data region of a statement as CSV records, tagging each with a
/// line number (1-based within the data region) for log messages.
fn read_records(
    lines: &[&str],
    delimiter: u8,
) -> Vec<(Result<csv::StringRecord, csv::Error>, usize)> {
    let data = lines.join("\n");

    let reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(std::io::Cursor::new(data.into_bytes()));

    reader
        .into_records()
        .enumerate()
        .map(|(index, record)| (record, index + 1))
        .collect()
}
