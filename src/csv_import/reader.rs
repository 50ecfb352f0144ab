//! Reads an uploaded CSV file and normalizes every data row.

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::{
    Error,
    csv_import::normalize::{
        CsvRow, NormalizeConfig, NormalizedRow, RowError, RowErrorKind, normalize_row,
    },
};

/// The result of normalizing every row of a CSV file.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct NormalizedCsv {
    /// The number of data rows read, valid or not.
    pub rows_read: usize,
    pub rows: Vec<NormalizedRow>,
    pub errors: Vec<RowError>,
}

/// Lower-case a header and join its words with underscores, e.g. "Amount  Rp" becomes "amount_rp".
pub fn normalize_header(header: &str) -> String {
    header
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// Parse `data` as CSV with a header row and normalize each record.
///
/// Records that cannot be decoded, such as rows with the wrong number of
/// fields, become row errors.
///
/// # Errors
/// Returns [Error::InvalidCSV] if the header row cannot be read.
pub fn read_csv(data: &[u8], config: &NormalizeConfig) -> Result<NormalizedCsv, Error> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(data);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|error| {
            tracing::debug!("Could not read CSV headers: {error}");
            Error::InvalidCSV(error.to_string())
        })?
        .iter()
        .map(normalize_header)
        .collect();

    let mut result = NormalizedCsv::default();
    let mut record = StringRecord::new();

    loop {
        let row_number = result.rows_read + 1;

        match reader.read_record(&mut record) {
            Ok(false) => break,
            Ok(true) => {
                let row: CsvRow = headers
                    .iter()
                    .cloned()
                    .zip(record.iter().map(str::to_owned))
                    .collect();

                match normalize_row(&row, row_number, config) {
                    Ok(normalized) => result.rows.push(normalized),
                    Err(error) => result.errors.push(error),
                }
            }
            Err(error) if error.is_io_error() => {
                return Err(Error::InvalidCSV(error.to_string()));
            }
            Err(error) => result.errors.push(RowError {
                row: row_number,
                error: RowErrorKind::InvalidFormat {
                    field: "row",
                    value: error.to_string(),
                },
            }),
        }

        result.rows_read = row_number;
    }

    tracing::debug!(
        "Read {} CSV rows: {} valid, {} invalid",
        result.rows_read,
        result.rows.len(),
        result.errors.len()
    );

    Ok(result)
}
