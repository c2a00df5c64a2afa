use axum::routing::get;
use axum::Router;

use crate::handlers::secured_files;
use crate::state::AppState;

/// Routes mounted at `/secured-files`.
///
/// ```text
/// GET /{client_id}/{filename}  -> get_file
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{client_id}/{filename}", get(secured_files::get_file))
}
