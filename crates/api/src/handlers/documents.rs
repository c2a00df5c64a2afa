//! Source document upload (`POST /clients/{client_id}/documents`).
//!
//! The returned secured URL can be passed as `document_url` when creating a
//! signature session.

use axum::extract::{Multipart, Path, State};
use gervis_core::client_log::LOG_DOCUMENT_UPLOADED;
use gervis_core::storage::{client_dir, document_filename, ensure_pdf, secured_url};
use gervis_core::tokens::now;
use gervis_core::types::DbId;
use gervis_db::models::client_log::CreateClientLog;
use gervis_db::repositories::ClientLogRepo;
use serde::Serialize;

use crate::access::owned_client;
use crate::error::{AppError, AppResult};
use crate::files::write_new;
use crate::middleware::auth::AuthUser;
use crate::response::{created, Created};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UploadedDocument {
    pub document_url: String,
    pub original_name: Option<String>,
    pub size_bytes: usize,
}

pub async fn upload_document(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(client_id): Path<DbId>,
    mut multipart: Multipart,
) -> AppResult<Created<UploadedDocument>> {
    let client = owned_client(&state.pool, client_id, auth.user_id).await?;

    let mut file_data: Option<(Option<String>, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() == Some("file") {
            let original_name = field.file_name().map(str::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            file_data = Some((original_name, data.to_vec()));
        }
    }

    let (original_name, data) =
        file_data.ok_or_else(|| AppError::BadRequest("Missing required 'file' field".into()))?;
    ensure_pdf(&data)?;

    let dir = client_dir(&state.config.storage_root, client.id);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?;

    let (_, filename) = write_new(&dir, now(), |at| document_filename(client.id, at), &data)
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?;

    let document_url = secured_url(client.id, &filename);

    ClientLogRepo::create(
        &state.pool,
        &CreateClientLog {
            client_id: client.id,
            user_id: Some(auth.user_id),
            log_type: LOG_DOCUMENT_UPLOADED,
            content: format!(
                "Document uploaded: {}",
                original_name.as_deref().unwrap_or(&filename)
            ),
            details_json: Some(serde_json::json!({ "document_url": document_url })),
        },
    )
    .await?;

    tracing::info!(client_id = client.id, %document_url, "Document uploaded");

    Ok(created(UploadedDocument {
        document_url,
        original_name,
        size_bytes: data.len(),
    }))
}
