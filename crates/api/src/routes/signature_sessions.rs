//! Route definitions for the `/signature-sessions` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::signature_sessions;
use crate::state::AppState;

/// Routes mounted at `/signature-sessions`.
///
/// ```text
/// POST /                     -> create_session (requires auth)
/// GET  /{session_id}         -> get_session_info (token)
/// GET  /{session_id}/status  -> get_session_status (token)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(signature_sessions::create_session))
        .route("/{session_id}", get(signature_sessions::get_session_info))
        .route(
            "/{session_id}/status",
            get(signature_sessions::get_session_status),
        )
}
