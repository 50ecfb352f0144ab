//! Importing transactions from CSV files: normalizing rows, previewing the
//! result, committing it as an import batch and listing past imports.

mod batch;
mod commit;
mod history;
mod multipart;
mod normalize;
mod preview;
mod reader;

pub use batch::create_import_batch_table;
pub use commit::commit_import_endpoint;
pub use history::get_import_history_endpoint;
pub use multipart::{MAX_UPLOAD_REQUEST_SIZE, MAX_UPLOAD_SIZE};
pub use normalize::DecimalSeparator;
pub use preview::preview_import_endpoint;
