pub mod clients;
pub mod health;
pub mod onboarding;
pub mod secured_files;
pub mod signature_sessions;
pub mod user;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/login                                      login (public)
/// /auth/refresh                                    refresh (public)
/// /auth/logout                                     logout (requires auth)
///
/// /user/smtp-settings                              get, put, delete (requires auth)
///
/// /clients/{client_id}/documents                   upload source PDF (requires auth)
/// /clients/{client_id}/logs                        interaction log (requires auth)
///
/// /onboarding-tokens                               issue link (requires auth)
/// /onboarding?token=                               resolve, submit (public, token)
///
/// /signature-sessions                              create (requires auth)
/// /signature-sessions/{session_id}?token=          info (public, token)
/// /signature-sessions/{session_id}/status?token=   status (public, token)
///
/// /verify-identity                                 multipart captures (public, token)
/// /verified-documents/{client_id}                  list (requires auth)
///
/// /secured-files/{client_id}/{filename}            file download (requires auth)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route("/auth/logout", post(handlers::auth::logout))
        .nest("/user", user::router())
        .nest("/clients", clients::router())
        .route(
            "/onboarding-tokens",
            post(handlers::onboarding_tokens::issue_token),
        )
        .merge(onboarding::router())
        .nest("/signature-sessions", signature_sessions::router())
        .route(
            "/verify-identity",
            post(handlers::verification::verify_identity),
        )
        .route(
            "/verified-documents/{client_id}",
            get(handlers::verification::list_verified_documents),
        )
        .nest("/secured-files", secured_files::router())
}
