//! Route definitions for the advisor's own settings.

use axum::routing::get;
use axum::Router;

use crate::handlers::smtp_settings;
use crate::state::AppState;

/// Routes mounted at `/user`.
///
/// ```text
/// GET    /smtp-settings  -> get_settings
/// PUT    /smtp-settings  -> put_settings
/// DELETE /smtp-settings  -> delete_settings
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/smtp-settings",
        get(smtp_settings::get_settings)
            .put(smtp_settings::put_settings)
            .delete(smtp_settings::delete_settings),
    )
}
