//! Handlers for signature sessions.
//!
//! Creation is advisor-authenticated. Info and status are public and
//! authorized only by the session token, compared in constant time.
//!
//! Expiry is observed lazily: [`effective_status`] decides what a session is
//! at `now`, and a pending-but-overdue session is then moved to `expired` by
//! the repository's conditional update.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use gervis_core::client_log::LOG_SIGNATURE_SESSION_CREATED;
use gervis_core::error::CoreError;
use gervis_core::signature::{
    effective_status, needs_expiry_write, session_expiry, SessionAvailability, SessionStatus,
};
use gervis_core::storage::resolve_url;
use gervis_core::tokens::{
    generate_session_id, generate_token, now, resolve_presented_token, tokens_match,
};
use gervis_core::types::{DbId, Timestamp};
use gervis_db::models::client_log::CreateClientLog;
use gervis_db::models::signature_session::{CreateSignatureSession, SignatureSession};
use gervis_db::repositories::{ClientLogRepo, ClientRepo, SignatureSessionRepo};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::access::owned_client;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::{created, Created, DataResponse};
use crate::state::AppState;

/// Message shared by every expired-session rejection.
pub(crate) const EXPIRED_MESSAGE: &str = "This signature link has expired";

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSessionRequest {
    pub client_id: DbId,
    #[validate(length(max = 2048))]
    pub document_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedSession {
    pub session_id: String,
    pub token: String,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
}

#[derive(Debug, Deserialize)]
pub struct SessionTokenQuery {
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub client_id: DbId,
    pub client_name: String,
    pub document_url: Option<String>,
    pub expires_at: Timestamp,
}

#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    pub status: SessionAvailability,
    pub message: &'static str,
    pub completed_at: Option<Timestamp>,
}

// ---------------------------------------------------------------------------
// POST /signature-sessions
// ---------------------------------------------------------------------------

pub async fn create_session(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreateSessionRequest>,
) -> AppResult<Created<CreatedSession>> {
    input.validate()?;

    let client = owned_client(&state.pool, input.client_id, auth.user_id).await?;

    let document_url = input
        .document_url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());

    // A secured document must live in this client's own directory.
    if let Some(url) = &document_url {
        if let Some(resolved) = resolve_url(&state.config.storage_root, url) {
            if resolved.client_id.is_some_and(|owner| owner != client.id) {
                return Err(CoreError::Forbidden(
                    "Document belongs to another client".into(),
                )
                .into());
            }
        }
    }

    let created_at = now();
    let session = SignatureSessionRepo::create(
        &state.pool,
        &CreateSignatureSession {
            session_id: generate_session_id(created_at),
            token: generate_token(),
            client_id: client.id,
            created_by: auth.user_id,
            document_url,
            created_at,
            expires_at: session_expiry(created_at),
        },
    )
    .await?;

    ClientLogRepo::create(
        &state.pool,
        &CreateClientLog {
            client_id: client.id,
            user_id: Some(auth.user_id),
            log_type: LOG_SIGNATURE_SESSION_CREATED,
            content: "Signature session created".to_string(),
            details_json: Some(serde_json::json!({
                "session_id": session.session_id,
                "document_url": session.document_url,
                "expires_at": session.expires_at,
            })),
        },
    )
    .await?;

    tracing::info!(
        session_id = %session.session_id,
        client_id = client.id,
        user_id = auth.user_id,
        "Signature session created"
    );

    Ok(created(CreatedSession {
        session_id: session.session_id,
        token: session.token,
        expires_at: session.expires_at,
        created_at: session.created_at,
    }))
}

// ---------------------------------------------------------------------------
// GET /signature-sessions/{session_id}?token=
// ---------------------------------------------------------------------------

pub async fn get_session_info(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<SessionTokenQuery>,
    headers: HeaderMap,
) -> AppResult<Json<DataResponse<SessionInfo>>> {
    let session = load_session(&state, &session_id).await?;
    authorize(&session, presented_token(None, query.token.as_deref(), &headers))?;

    match observe_status(&state, &session, now()).await? {
        SessionStatus::Pending => {}
        SessionStatus::Expired => return Err(CoreError::Expired(EXPIRED_MESSAGE.into()).into()),
        status => return Err(AppError::SessionClosed { status }),
    }

    let client = ClientRepo::find_by_id(&state.pool, session.client_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Client", session.client_id))?;

    Ok(Json(DataResponse {
        data: SessionInfo {
            session_id: session.session_id,
            client_id: client.id,
            client_name: client.full_name(),
            document_url: session.document_url,
            expires_at: session.expires_at,
        },
    }))
}

// ---------------------------------------------------------------------------
// GET /signature-sessions/{session_id}/status?token=
// ---------------------------------------------------------------------------

pub async fn get_session_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<SessionTokenQuery>,
    headers: HeaderMap,
) -> AppResult<Json<DataResponse<SessionStatusResponse>>> {
    let session = load_session(&state, &session_id).await?;
    authorize(&session, presented_token(None, query.token.as_deref(), &headers))?;

    let status = observe_status(&state, &session, now()).await?;
    let availability = SessionAvailability::from(status);

    // A completion that raced with this read is only visible after a re-read.
    let completed_at = match (status, session.completed_at) {
        (SessionStatus::Completed, None) => load_session(&state, &session_id).await?.completed_at,
        (_, completed_at) => completed_at,
    };

    Ok(Json(DataResponse {
        data: SessionStatusResponse {
            status: availability,
            message: availability.message(),
            completed_at,
        },
    }))
}

// ---------------------------------------------------------------------------
// Shared by verification
// ---------------------------------------------------------------------------

/// Find a session by public id. Unknown ids are an [`AppError::InvalidLink`].
pub(crate) async fn load_session(
    state: &AppState,
    session_id: &str,
) -> AppResult<SignatureSession> {
    SignatureSessionRepo::find_by_session_id(&state.pool, session_id)
        .await?
        .ok_or(AppError::InvalidLink)
}

/// Pick the token from body, query, or `Authorization: Bearer`, in that order.
pub(crate) fn presented_token(
    body: Option<&str>,
    query: Option<&str>,
    headers: &HeaderMap,
) -> Option<String> {
    let authorization = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    resolve_presented_token(body, query, authorization)
}

/// Reject a missing or non-matching session token.
pub(crate) fn authorize(session: &SignatureSession, presented: Option<String>) -> AppResult<()> {
    match presented {
        Some(token) if tokens_match(&token, &session.token) => Ok(()),
        _ => Err(CoreError::Unauthorized("Invalid session token".into()).into()),
    }
}

/// The session's status at `now`, persisting an expiry if this read is the
/// first to notice it.
///
/// When the conditional expiry update loses to a concurrent transition, the
/// row is re-read and its stored status wins.
pub(crate) async fn observe_status(
    state: &AppState,
    session: &SignatureSession,
    now: Timestamp,
) -> AppResult<SessionStatus> {
    let stored = session.status()?;
    let effective = effective_status(stored, session.expires_at, now);

    if !needs_expiry_write(stored, effective) {
        return Ok(effective);
    }

    if SignatureSessionRepo::mark_expired(&state.pool, &session.session_id, now).await? {
        tracing::info!(session_id = %session.session_id, "Signature session expired");
        return Ok(SessionStatus::Expired);
    }

    let current = load_session(state, &session.session_id).await?;
    Ok(current.status()?)
}
