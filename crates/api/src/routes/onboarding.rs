//! Route definitions for the public onboarding form.

use axum::routing::get;
use axum::Router;

use crate::handlers::onboarding;
use crate::state::AppState;

/// ```text
/// GET  /onboarding?token=  -> resolve_token
/// POST /onboarding?token=  -> submit
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/onboarding",
        get(onboarding::resolve_token).post(onboarding::submit),
    )
}
