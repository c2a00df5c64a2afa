//! Route definitions for client-scoped advisor operations.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{client_logs, documents};
use crate::state::AppState;

/// Routes mounted at `/clients`.
///
/// ```text
/// POST /{client_id}/documents  -> upload_document
/// GET  /{client_id}/logs       -> list_logs
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{client_id}/documents", post(documents::upload_document))
        .route("/{client_id}/logs", get(client_logs::list_logs))
}
