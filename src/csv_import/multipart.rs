//! Extracts the uploaded CSV file from a multipart form.

use axum::{
    extract::{
        Multipart,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
};

use crate::Error;

/// The form field that holds the CSV file.
pub const FILE_FIELD: &str = "file";

/// The largest accepted upload, in bytes.
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// The request body limit for upload routes: room for a [MAX_UPLOAD_SIZE]
/// file plus the multipart boundaries, part headers and other form fields.
pub const MAX_UPLOAD_REQUEST_SIZE: usize = MAX_UPLOAD_SIZE + 64 * 1024;

/// A file uploaded through a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Read the [FILE_FIELD] field of a multipart form.
///
/// # Errors
/// - [Error::NoFileProvided] if the request is not a multipart form or has no file field,
/// - [Error::FileTooLarge] if the file is larger than [MAX_UPLOAD_SIZE] bytes
///   or the request body is larger than [MAX_UPLOAD_REQUEST_SIZE] bytes,
/// - [Error::MultipartError] if the form cannot be read.
pub async fn read_uploaded_file(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<UploadedFile, Error> {
    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!("Rejected multipart request: {}", rejection.body_text());
        Error::NoFileProvided
    })?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(map_multipart_error)?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or("upload.csv").to_owned();
        let data = field.bytes().await.map_err(map_multipart_error)?;

        tracing::debug!("Received file '{}' that is {} bytes", filename, data.len());

        if data.len() > MAX_UPLOAD_SIZE {
            return Err(Error::FileTooLarge);
        }

        return Ok(UploadedFile {
            filename,
            data: data.to_vec(),
        });
    }

    Err(Error::NoFileProvided)
}

fn map_multipart_error(error: MultipartError) -> Error {
    tracing::debug!("Could not read multipart form: {}", error.body_text());

    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::FileTooLarge
    } else {
        Error::MultipartError(error.body_text())
    }
}
