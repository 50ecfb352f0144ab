//! Lists past imports.

use axum::{Extension, Json, extract::State};

use crate::{
    Error,
    auth::UserID,
    csv_import::{
        batch::{IMPORT_HISTORY_LIMIT, ImportBatch, get_import_history},
        commit::ImportState,
    },
    db::lock_connection,
};

/// Get the current user's most recent imports, newest first.
pub async fn get_import_history_endpoint(
    State(state): State<ImportState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<ImportBatch>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_import_history(user_id, IMPORT_HISTORY_LIMIT, &connection).map(Json)
}
