//! Verified document model. Immutable once created.

use gervis_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `verified_documents` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct VerifiedDocument {
    pub id: DbId,
    pub client_id: DbId,
    pub session_id: String,
    pub id_front_url: String,
    pub id_back_url: String,
    pub selfie_url: String,
    pub document_url: Option<String>,
    #[serde(skip)]
    pub token_used: String,
    pub verification_date: Timestamp,
    pub created_by: DbId,
    pub created_at: Timestamp,
}

/// DTO for recording a completed verification.
#[derive(Debug, Clone)]
pub struct CreateVerifiedDocument {
    pub client_id: DbId,
    pub session_id: String,
    pub id_front_url: String,
    pub id_back_url: String,
    pub selfie_url: String,
    pub document_url: Option<String>,
    pub token_used: String,
    pub verification_date: Timestamp,
    pub created_by: DbId,
}
