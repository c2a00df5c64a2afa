//! Access-controlled file retrieval (`GET /secured-files/{client_id}/{filename}`).

use axum::extract::{Path, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::IntoResponse;
use gervis_core::error::CoreError;
use gervis_core::storage::{client_dir, content_type_for, validate_filename};
use gervis_core::types::DbId;

use crate::access::owned_client;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

pub async fn get_file(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((client_id, filename)): Path<(DbId, String)>,
) -> AppResult<impl IntoResponse> {
    owned_client(&state.pool, client_id, auth.user_id).await?;
    validate_filename(&filename)?;

    let path = client_dir(&state.config.storage_root, client_id).join(&filename);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(CoreError::not_found("File", &filename).into());
        }
        Err(e) => return Err(AppError::InternalError(e.to_string())),
    };

    Ok((
        [
            (CONTENT_TYPE, content_type_for(&filename)),
            (CACHE_CONTROL, "private, no-store"),
        ],
        bytes,
    ))
}
