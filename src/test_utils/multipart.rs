use axum::{
    body::Body,
    extract::{FromRequest, Multipart},
    http::{Request, header::CONTENT_TYPE},
};
use axum_test::multipart::{MultipartForm, Part};

const BOUNDARY: &str = "MY_BOUNDARY123456789";
const TEST_FILENAME: &str = "statement.csv";

/// A multipart form with `csv` as the uploaded file, for use with `TestServer`.
pub(crate) fn multipart_csv_form(csv: &str) -> MultipartForm {
    let part = Part::bytes(csv.as_bytes().to_vec())
        .file_name(TEST_FILENAME)
        .mime_type("text/csv");

    MultipartForm::new().add_part("file", part)
}

/// A [Multipart] extractor holding `csv` as the uploaded file "statement.csv".
pub(crate) async fn must_make_multipart_csv(csv: &str) -> Multipart {
    let body = format!(
        "--{BOUNDARY}\r\n\
        Content-Disposition: form-data; name=\"file\"; filename=\"{TEST_FILENAME}\"\r\n\
        Content-Type: text/csv\r\n\
        \r\n\
        {csv}\r\n\
        --{BOUNDARY}--\r\n"
    );

    must_build_multipart(body).await
}

/// A [Multipart] extractor with a single text field.
pub(crate) async fn must_make_multipart(field_name: &str, content: &str) -> Multipart {
    let body = format!(
        "--{BOUNDARY}\r\n\
        Content-Disposition: form-data; name=\"{field_name}\"\r\n\
        \r\n\
        {content}\r\n\
        --{BOUNDARY}--\r\n"
    );

    must_build_multipart(body).await
}

async fn must_build_multipart(body: String) -> Multipart {
    let request = Request::builder()
        .method("POST")
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("Could not build multipart request");

    Multipart::from_request(request, &())
        .await
        .expect("Could not extract multipart form")
}
