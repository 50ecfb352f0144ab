#![allow(missing_docs)]

pub(crate) mod multipart;

pub(crate) use multipart::{must_make_multipart, must_make_multipart_csv, multipart_csv_form};
