//! Identity verification for signature sessions.
//!
//! `POST /verify-identity` is called from the client's phone with the three
//! captures. Checks run in a fixed order and the request touches the
//! filesystem only after all of them pass. The final write is a single
//! conditional transaction, so racing submissions produce one verified
//! document.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use axum::extract::{Multipart, Path as UrlPath, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use gervis_core::error::CoreError;
use gervis_core::signature::SessionStatus;
use gervis_core::stamping::{stamp, Attestation, StampOutcome};
use gervis_core::storage::{
    attestation_filename, capture_filename, client_dir, ensure_image, resolve_url, secured_url,
    signed_filename, CaptureKind,
};
use gervis_core::tokens::now;
use gervis_core::types::{DbId, Timestamp};
use gervis_db::models::signature_session::SignatureSession;
use gervis_db::models::verified_document::{CreateVerifiedDocument, VerifiedDocument};
use gervis_db::repositories::{
    ClientRepo, SessionCompletion, SignatureSessionRepo, VerifiedDocumentRepo,
};
use serde::{Deserialize, Serialize};

use crate::access::owned_client;
use crate::error::{AppError, AppResult};
use crate::files::{remove_all, reserve_file, write_new};
use crate::handlers::signature_sessions::{
    authorize, load_session, observe_status, presented_token, EXPIRED_MESSAGE,
};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct VerifyQuery {
    pub token: Option<String>,
    #[serde(rename = "sessionId", alias = "session_id")]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerificationResult {
    pub success: bool,
    pub document_url: Option<String>,
    pub verification_date: Timestamp,
}

/// Multipart fields of a verification request, held in memory until every
/// check has passed.
#[derive(Default)]
struct VerificationForm {
    session_id: Option<String>,
    token: Option<String>,
    captures: HashMap<&'static str, Vec<u8>>,
}

impl VerificationForm {
    async fn read(multipart: &mut Multipart) -> AppResult<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            let name = field.name().unwrap_or("").to_string();
            match name.as_str() {
                "sessionId" | "session_id" => {
                    form.session_id = Some(
                        field
                            .text()
                            .await
                            .map_err(|e| AppError::BadRequest(e.to_string()))?,
                    );
                }
                "token" => {
                    form.token = Some(
                        field
                            .text()
                            .await
                            .map_err(|e| AppError::BadRequest(e.to_string()))?,
                    );
                }
                other => {
                    if let Some(kind) = CaptureKind::from_field_name(other) {
                        let data = field
                            .bytes()
                            .await
                            .map_err(|e| AppError::BadRequest(e.to_string()))?;
                        if !data.is_empty() {
                            form.captures.insert(kind.field_name(), data.to_vec());
                        }
                    }
                }
            }
        }

        Ok(form)
    }

    /// All three captures in [`CaptureKind::ALL`] order, or the names of the missing ones.
    fn take_captures(&mut self) -> Result<Vec<(CaptureKind, Vec<u8>)>, CoreError> {
        let missing: Vec<&str> = CaptureKind::ALL
            .iter()
            .map(|k| k.field_name())
            .filter(|name| !self.captures.contains_key(name))
            .collect();
        if !missing.is_empty() {
            return Err(CoreError::Validation(format!(
                "Missing required files: {}",
                missing.join(", ")
            )));
        }

        Ok(CaptureKind::ALL
            .iter()
            .filter_map(|k| self.captures.remove(k.field_name()).map(|bytes| (*k, bytes)))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// POST /verify-identity
// ---------------------------------------------------------------------------

pub async fn verify_identity(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> AppResult<Json<DataResponse<VerificationResult>>> {
    let mut form = VerificationForm::read(&mut multipart).await?;

    let session_id = form
        .session_id
        .as_deref()
        .or(query.session_id.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CoreError::Validation("sessionId is required".into()))?
        .to_string();

    // 1. The session exists.
    let session = load_session(&state, &session_id).await?;

    // 2. It is still pending.
    reject_unless_pending(session.status()?)?;

    // 3. The token matches.
    authorize(
        &session,
        presented_token(form.token.as_deref(), query.token.as_deref(), &headers),
    )?;

    // 4. It has not expired.
    let now = now();
    reject_unless_pending(observe_status(&state, &session, now).await?)?;

    // 5. No verified document exists yet.
    if VerifiedDocumentRepo::find_by_session_id(&state.pool, &session.session_id)
        .await?
        .is_some()
    {
        return Err(AppError::AlreadyVerified);
    }

    // 6. All three captures are present and are images.
    let captures = form.take_captures()?;
    for (kind, bytes) in &captures {
        ensure_image(*kind, bytes)?;
    }

    // Checks done; from here on files are written.
    let dir = client_dir(&state.config.storage_root, session.client_id);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?;

    let mut written: Vec<PathBuf> = Vec::with_capacity(4);
    let mut urls: HashMap<&'static str, String> = HashMap::new();
    for (kind, bytes) in &captures {
        let name_at = |at| capture_filename(*kind, session.client_id, at);
        let (path, filename) = match write_new(&dir, now, name_at, bytes).await {
            Ok(stored) => stored,
            Err(e) => {
                remove_all(&written).await;
                return Err(AppError::InternalError(format!(
                    "Failed to store {}: {e}",
                    kind.field_name()
                )));
            }
        };
        written.push(path);
        urls.insert(kind.field_name(), secured_url(session.client_id, &filename));
    }

    let document_url = match session.document_url.as_deref() {
        Some(original) => {
            let stamped = stamp_document(&state, &session, &dir, original, now).await;
            if let Some(path) = &stamped.produced {
                written.push(path.clone());
            }
            Some(stamped.url)
        }
        None => None,
    };

    let input = CreateVerifiedDocument {
        client_id: session.client_id,
        session_id: session.session_id.clone(),
        id_front_url: urls.remove(CaptureKind::IdFront.field_name()).unwrap_or_default(),
        id_back_url: urls.remove(CaptureKind::IdBack.field_name()).unwrap_or_default(),
        selfie_url: urls.remove(CaptureKind::Selfie.field_name()).unwrap_or_default(),
        document_url,
        token_used: session.token.clone(),
        verification_date: now,
        created_by: session.created_by,
    };

    let document = match SignatureSessionRepo::complete_with_document(&state.pool, &input, now)
        .await
    {
        Ok(SessionCompletion::Completed { document, .. }) => document,
        Ok(SessionCompletion::NotPending) => {
            // Another request completed (or expired) the session first.
            remove_all(&written).await;
            let current = load_session(&state, &session.session_id).await?;
            reject_unless_pending(current.status()?)?;
            return Err(AppError::AlreadyVerified);
        }
        Err(e) => {
            remove_all(&written).await;
            return Err(e.into());
        }
    };

    tracing::info!(
        session_id = %document.session_id,
        client_id = document.client_id,
        "Identity verification completed"
    );

    Ok(Json(DataResponse {
        data: VerificationResult {
            success: true,
            document_url: document.document_url,
            verification_date: document.verification_date,
        },
    }))
}

// ---------------------------------------------------------------------------
// GET /verified-documents/{client_id}
// ---------------------------------------------------------------------------

pub async fn list_verified_documents(
    State(state): State<AppState>,
    auth: AuthUser,
    UrlPath(client_id): UrlPath<DbId>,
) -> AppResult<Json<DataResponse<Vec<VerifiedDocument>>>> {
    owned_client(&state.pool, client_id, auth.user_id).await?;
    let documents = VerifiedDocumentRepo::list_by_client(&state.pool, client_id).await?;
    Ok(Json(DataResponse { data: documents }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn reject_unless_pending(status: SessionStatus) -> AppResult<()> {
    match status {
        SessionStatus::Pending => Ok(()),
        SessionStatus::Completed => Err(AppError::AlreadyVerified),
        SessionStatus::Expired => Err(CoreError::Expired(EXPIRED_MESSAGE.into()).into()),
        SessionStatus::Rejected => Err(AppError::SessionClosed {
            status: SessionStatus::Rejected,
        }),
    }
}

struct StampedDocument {
    /// URL to record on the verified document.
    url: String,
    /// File created by this request, if any.
    produced: Option<PathBuf>,
}

/// Produce the signed copy of the session's document.
///
/// Never fails: when the original cannot be resolved, is missing, or cannot
/// even be copied, the original URL is kept.
async fn stamp_document(
    state: &AppState,
    session: &SignatureSession,
    dir: &Path,
    original_url: &str,
    now: Timestamp,
) -> StampedDocument {
    let keep_original = || StampedDocument {
        url: original_url.to_string(),
        produced: None,
    };

    let Some(resolved) = resolve_url(&state.config.storage_root, original_url) else {
        tracing::warn!(
            session_id = %session.session_id,
            url = original_url,
            "Document URL does not resolve to stored file, keeping it as is"
        );
        return keep_original();
    };

    let signer_name = match ClientRepo::find_by_id(&state.pool, session.client_id).await {
        Ok(client) => client.map(|c| c.full_name()),
        Err(e) => {
            tracing::warn!(error = %e, "Could not load client name for attestation");
            None
        }
    };

    let signed = match reserve_file(dir, now, |at| signed_filename(&resolved.path, at)).await {
        Ok((_, path, _)) => path,
        Err(e) => {
            tracing::warn!(error = %e, "Could not reserve signed filename, keeping original URL");
            return keep_original();
        }
    };
    let attestation_path = dir.join(attestation_filename(&session.session_id, now));
    let attestation = Attestation {
        session_id: session.session_id.clone(),
        completed_at: now,
        signer_name,
    };

    match stamp(&resolved.path, &signed, &attestation_path, &attestation).await {
        Ok(StampOutcome::Produced { artifact, enriched }) => {
            tracing::info!(
                session_id = %session.session_id,
                enriched,
                "Signed document produced"
            );
            match artifact.file_name().and_then(|n| n.to_str()) {
                Some(filename) => StampedDocument {
                    url: secured_url(session.client_id, filename),
                    produced: Some(artifact.clone()),
                },
                None => keep_original(),
            }
        }
        Ok(StampOutcome::SourceMissing) => {
            remove_all(std::slice::from_ref(&signed)).await;
            keep_original()
        }
        Err(e) => {
            tracing::warn!(
                session_id = %session.session_id,
                error = %e,
                "Could not copy source document, keeping original URL"
            );
            remove_all(std::slice::from_ref(&signed)).await;
            keep_original()
        }
    }
}
