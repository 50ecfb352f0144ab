//! Shows how a CSV file would be imported without saving anything.

use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
};
use serde::Serialize;

use crate::{
    Error,
    csv_import::{
        commit::{ImportState, MAX_REPORTED_ERRORS},
        multipart::read_uploaded_file,
        normalize::{NORMALIZED_COLUMNS, NormalizedRow, RowError},
        reader::{NormalizedCsv, read_csv},
    },
};

/// The number of normalized rows included in a preview.
pub const PREVIEW_ROW_COUNT: usize = 10;

/// A sample of the normalized rows of a CSV file and its row errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportPreview {
    pub preview: Vec<NormalizedRow>,
    /// The number of valid rows.
    pub total_rows: usize,
    pub errors: Vec<RowError>,
    pub total_errors: usize,
    /// The fields of a normalized row, empty if there are no valid rows.
    pub columns: Vec<&'static str>,
}

impl From<NormalizedCsv> for ImportPreview {
    fn from(mut normalized: NormalizedCsv) -> Self {
        let total_rows = normalized.rows.len();
        let total_errors = normalized.errors.len();
        let columns = if total_rows > 0 {
            NORMALIZED_COLUMNS.to_vec()
        } else {
            Vec::new()
        };

        normalized.rows.truncate(PREVIEW_ROW_COUNT);
        normalized.errors.truncate(MAX_REPORTED_ERRORS);

        Self {
            preview: normalized.rows,
            total_rows,
            errors: normalized.errors,
            total_errors,
            columns,
        }
    }
}

/// Normalize an uploaded CSV file and return a preview of the result.
pub async fn preview_import_endpoint(
    State(state): State<ImportState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ImportPreview>, Error> {
    let file = read_uploaded_file(multipart).await?;
    let normalized = read_csv(&file.data, &state.normalize_config()?)?;

    Ok(Json(normalized.into()))
}
