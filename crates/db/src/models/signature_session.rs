//! Signature session model and DTOs.

use gervis_core::error::CoreError;
use gervis_core::signature::SessionStatus;
use gervis_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `signature_sessions` table.
///
/// `token` is the bearer capability and is never serialized.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SignatureSession {
    #[serde(skip)]
    pub id: DbId,
    pub session_id: String,
    #[serde(skip)]
    pub token: String,
    pub client_id: DbId,
    pub created_by: DbId,
    pub document_url: Option<String>,
    pub status_id: i16,
    pub expires_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl SignatureSession {
    pub fn status(&self) -> Result<SessionStatus, CoreError> {
        SessionStatus::from_id(self.status_id)
    }
}

/// DTO for creating a signature session.
///
/// `created_at` is written explicitly so the stored lifetime is exactly
/// `expires_at - created_at`.
#[derive(Debug)]
pub struct CreateSignatureSession {
    pub session_id: String,
    pub token: String,
    pub client_id: DbId,
    pub created_by: DbId,
    pub document_url: Option<String>,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
}
