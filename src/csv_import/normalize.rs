//! Turns loosely formatted CSV rows from bank exports and hand-made spreadsheets
//! into transactions.
//!
//! Columns are matched by name against a list of aliases per field, so files
//! with English or Indonesian headers import without any column mapping.

use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use serde::{Serialize, Serializer};
use serde_json::Value;
use time::{
    Date, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset,
    format_description::{BorrowedFormatItem, well_known::Rfc3339},
    macros::format_description,
};

use crate::{
    database_id::ImportBatchId,
    timezone::to_utc,
    transaction::{
        DEFAULT_CATEGORY, MAX_AMOUNT, Transaction, TransactionBuilder, TransactionKind,
    },
};

/// A CSV record keyed by normalised column name.
pub type CsvRow = BTreeMap<String, String>;

const DATE_ALIASES: &[&str] = &["datetime_iso", "datetime", "date", "tanggal", "time"];
const AMOUNT_ALIASES: &[&str] = &["amount_rp", "amount", "nominal", "jumlah", "total"];
const KIND_ALIASES: &[&str] = &["kind", "type", "jenis"];
const MERCHANT_ALIASES: &[&str] = &["merchant", "description", "keterangan", "nama"];
const CHANNEL_ALIASES: &[&str] = &["channel", "bank"];
const STATUS_ALIASES: &[&str] = &["status"];
const CURRENCY_ALIASES: &[&str] = &["currency", "mata_uang"];
const FEE_ALIASES: &[&str] = &["fee_rp", "fee", "biaya"];
const SUMMARY_ALIASES: &[&str] = &["summary", "description", "keterangan"];
const CATEGORY_ALIASES: &[&str] = &["category_code", "category", "kategori"];
const REFERENCE_ID_ALIASES: &[&str] = &["reference_id", "reference", "ref", "no_referensi"];
const DEBIT_COLUMN: &str = "debit";
const CREDIT_COLUMN: &str = "credit";

/// The field names of a serialized [NormalizedRow], in order.
pub const NORMALIZED_COLUMNS: &[&str] = &[
    "row",
    "kind",
    "channel",
    "status",
    "merchant",
    "occurred_at",
    "currency",
    "amount",
    "fee",
    "total",
    "summary",
    "category_code",
    "reference_id",
];

/// The character used as the decimal point in CSV amounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecimalSeparator {
    /// `1,234.50`: '.' is the decimal point and ',' is ignored.
    #[default]
    Dot,
    /// `1.234,50`: ',' is the decimal point and '.' is ignored.
    Comma,
}

impl DecimalSeparator {
    fn as_char(self) -> char {
        match self {
            DecimalSeparator::Dot => '.',
            DecimalSeparator::Comma => ',',
        }
    }
}

impl FromStr for DecimalSeparator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dot" => Ok(DecimalSeparator::Dot),
            "comma" => Ok(DecimalSeparator::Comma),
            other => Err(format!(
                "unknown decimal separator \"{other}\", expected \"dot\" or \"comma\""
            )),
        }
    }
}

impl Display for DecimalSeparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecimalSeparator::Dot => write!(f, "dot"),
            DecimalSeparator::Comma => write!(f, "comma"),
        }
    }
}

/// Defaults and locale used when normalizing rows.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeConfig {
    pub default_category: String,
    pub default_channel: String,
    pub default_status: String,
    pub default_currency: String,
    pub decimal_separator: DecimalSeparator,
    /// Applied to dates and times that do not specify an offset.
    pub local_offset: UtcOffset,
}

impl NormalizeConfig {
    pub fn new(decimal_separator: DecimalSeparator, local_offset: UtcOffset) -> Self {
        Self {
            default_category: DEFAULT_CATEGORY.to_owned(),
            default_channel: "csv_import".to_owned(),
            default_status: "completed".to_owned(),
            default_currency: "IDR".to_owned(),
            decimal_separator,
            local_offset,
        }
    }
}

/// Why a single row could not be imported.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowErrorKind {
    /// None of the aliases for a required field had a value.
    #[error("Missing {0} field")]
    MissingField(&'static str),

    /// A value (or the record itself) could not be interpreted.
    #[error("Invalid {field} format: {value}")]
    InvalidFormat { field: &'static str, value: String },

    /// The row was valid but the database refused it, e.g. an unknown category.
    #[error("{0}")]
    Rejected(String),
}

impl Serialize for RowErrorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A row-level error with the 1-based data row number it occurred on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub row: usize,
    pub error: RowErrorKind,
}

/// A CSV row interpreted as a transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRow {
    /// The 1-based data row number.
    pub row: usize,
    pub kind: TransactionKind,
    pub channel: String,
    pub status: String,
    pub merchant: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub occurred_at: OffsetDateTime,
    pub currency: String,
    pub amount: i64,
    pub fee: i64,
    pub total: i64,
    pub summary: Option<String>,
    pub category_code: String,
    pub reference_id: Option<String>,
    #[serde(skip)]
    pub raw: CsvRow,
}

impl NormalizedRow {
    /// Prepare the row for insertion as part of an import batch.
    pub fn to_builder(&self, import_batch_id: ImportBatchId) -> TransactionBuilder {
        let raw_payload = Value::Object(
            self.raw
                .iter()
                .map(|(key, value)| (key.clone(), Value::String(value.clone())))
                .collect(),
        );

        Transaction::build(self.kind, self.amount, self.occurred_at)
            .channel(&self.channel)
            .status(&self.status)
            .merchant(self.merchant.clone())
            .reference_id(self.reference_id.clone())
            .currency(&self.currency)
            .fee(self.fee)
            .total(Some(self.total))
            .summary(self.summary.clone())
            .category_code(&self.category_code)
            .raw_payload(raw_payload)
            .import_batch_id(Some(import_batch_id))
    }
}

/// Interpret one CSV row as a transaction.
///
/// `row` must already have lower-cased, underscore separated column names and
/// trimmed values.
pub fn normalize_row(
    row: &CsvRow,
    row_number: usize,
    config: &NormalizeConfig,
) -> Result<NormalizedRow, RowError> {
    let row_error = |error| RowError {
        row: row_number,
        error,
    };

    let date_value =
        lookup(row, DATE_ALIASES).ok_or_else(|| row_error(RowErrorKind::MissingField("date")))?;
    let occurred_at = parse_date(date_value, config.local_offset).ok_or_else(|| {
        row_error(RowErrorKind::InvalidFormat {
            field: "date",
            value: date_value.to_owned(),
        })
    })?;

    let separator = config.decimal_separator;
    let amount = lookup(row, AMOUNT_ALIASES)
        .and_then(|value| parse_amount(value, separator))
        .unwrap_or(0.0);
    let (kind, amount) = infer_kind(row, amount, separator);
    let amount = to_minor_units(amount).ok_or_else(|| {
        row_error(RowErrorKind::InvalidFormat {
            field: "amount",
            value: lookup(row, AMOUNT_ALIASES).unwrap_or_default().to_owned(),
        })
    })?;

    let fee_value = lookup(row, FEE_ALIASES);
    let fee = fee_value
        .and_then(|value| parse_amount(value, separator))
        .map_or(Some(0), to_minor_units)
        .ok_or_else(|| {
            row_error(RowErrorKind::InvalidFormat {
                field: "fee",
                value: fee_value.unwrap_or_default().to_owned(),
            })
        })?;

    let text_or = |aliases, default: &str| lookup(row, aliases).unwrap_or(default).to_owned();
    let optional_text = |aliases| lookup(row, aliases).map(str::to_owned);

    Ok(NormalizedRow {
        row: row_number,
        kind,
        channel: text_or(CHANNEL_ALIASES, &config.default_channel),
        status: text_or(STATUS_ALIASES, &config.default_status),
        merchant: optional_text(MERCHANT_ALIASES),
        occurred_at,
        currency: text_or(CURRENCY_ALIASES, &config.default_currency),
        amount,
        fee,
        total: amount,
        summary: optional_text(SUMMARY_ALIASES),
        category_code: text_or(CATEGORY_ALIASES, &config.default_category),
        reference_id: optional_text(REFERENCE_ID_ALIASES),
        raw: row.clone(),
    })
}

/// The first alias with a non-empty value.
fn lookup<'a>(row: &'a CsvRow, aliases: &[&str]) -> Option<&'a str> {
    aliases
        .iter()
        .filter_map(|alias| row.get(*alias))
        .map(String::as_str)
        .find(|value| !value.is_empty())
}

fn infer_kind(row: &CsvRow, amount: f64, separator: DecimalSeparator) -> (TransactionKind, f64) {
    if let Some(kind) = lookup(row, KIND_ALIASES) {
        let kind = if kind.eq_ignore_ascii_case("credit") || kind.eq_ignore_ascii_case("masuk") {
            TransactionKind::Credit
        } else {
            TransactionKind::Debit
        };

        return (kind, amount);
    }

    if amount < 0.0 {
        return (TransactionKind::Debit, amount);
    }

    let positive_column = |column: &str| {
        row.get(column)
            .and_then(|value| parse_amount(value, separator))
            .filter(|value| *value > 0.0)
    };

    if let Some(debit) = positive_column(DEBIT_COLUMN) {
        (TransactionKind::Debit, debit)
    } else if let Some(credit) = positive_column(CREDIT_COLUMN) {
        (TransactionKind::Credit, credit)
    } else {
        (TransactionKind::Debit, amount)
    }
}

/// Round `amount` to whole minor units, or `None` if it is not a number or is
/// larger than [MAX_AMOUNT].
fn to_minor_units(amount: f64) -> Option<i64> {
    let amount = amount.abs().round();

    (amount.is_finite() && amount <= MAX_AMOUNT as f64).then_some(amount as i64)
}

/// Parse a money amount, ignoring currency symbols and thousands separators.
///
/// Returns `None` if no number can be read from the start of the cleaned value.
fn parse_amount(value: &str, separator: DecimalSeparator) -> Option<f64> {
    let decimal_point = separator.as_char();
    let cleaned: String = value
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == decimal_point || *c == '-')
        .map(|c| if c == decimal_point { '.' } else { c })
        .collect();

    numeric_prefix(&cleaned).parse().ok()
}

/// The longest prefix of `s` that reads as a decimal number, e.g. "12.5" for "12.5.3-1".
fn numeric_prefix(s: &str) -> &str {
    let bytes = s.as_bytes();
    let count_digits = |from: usize| {
        bytes[from..]
            .iter()
            .take_while(|byte| byte.is_ascii_digit())
            .count()
    };

    let mut end = usize::from(bytes.first() == Some(&b'-'));
    let integer_digits = count_digits(end);
    end += integer_digits;

    let mut fraction_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        fraction_digits = count_digits(end + 1);
        if fraction_digits > 0 {
            end += 1 + fraction_digits;
        }
    }

    if integer_digits + fraction_digits == 0 {
        ""
    } else {
        &s[..end]
    }
}

const DATE_TIME_FORMATS: &[&[BorrowedFormatItem<'static>]] = &[
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]"),
];

const TIME_FORMATS: &[&[BorrowedFormatItem<'static>]] = &[
    format_description!("[hour]:[minute]:[second]"),
    format_description!("[hour]:[minute]"),
];

/// Parse a date or date-time, interpreting values without an offset in `local_offset`.
///
/// Dates without a time are placed at local midnight. Slash or dash separated
/// dates are read as year/month/day when the first part has four digits and
/// as day/month/year otherwise, optionally followed by a time. Dates that
/// cannot be represented in UTC are rejected.
fn parse_date(value: &str, local_offset: UtcOffset) -> Option<OffsetDateTime> {
    parse_local_date(value, local_offset).filter(|date_time| to_utc(*date_time).is_ok())
}

fn parse_local_date(value: &str, local_offset: UtcOffset) -> Option<OffsetDateTime> {
    if let Ok(date_time) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(date_time);
    }

    let spaced = value.replacen('T', " ", 1);
    if let Some(date_time) = DATE_TIME_FORMATS
        .iter()
        .find_map(|format| PrimitiveDateTime::parse(&spaced, format).ok())
    {
        return Some(date_time.assume_offset(local_offset));
    }

    let (date, time) = match value.split_once(char::is_whitespace) {
        Some((date, time)) => (date, Some(time.trim())),
        None => (value, None),
    };
    let time = match time {
        Some(time) => TIME_FORMATS
            .iter()
            .find_map(|format| Time::parse(time, format).ok())?,
        None => Time::MIDNIGHT,
    };

    parse_calendar_date(date).map(|date| date.with_time(time).assume_offset(local_offset))
}

fn parse_calendar_date(value: &str) -> Option<Date> {
    let parts: Vec<&str> = value.split(['/', '-']).collect();
    let [first, second, third] = parts.as_slice() else {
        return None;
    };

    let (year, month, day) = if first.len() == 4 {
        (first, second, third)
    } else {
        (third, second, first)
    };

    let year: i32 = year.parse().ok()?;
    let month = Month::try_from(month.parse::<u8>().ok()?).ok()?;
    let day: u8 = day.parse().ok()?;

    Date::from_calendar_date(year, month, day).ok()
}
