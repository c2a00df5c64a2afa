//! Onboarding link model and DTOs.

use gervis_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `onboarding_tokens` table.
#[derive(Debug, Clone, FromRow)]
pub struct OnboardingToken {
    pub id: DbId,
    pub token_hash: String,
    pub client_id: DbId,
    pub created_by: DbId,
    pub language: String,
    pub custom_message: Option<String>,
    pub custom_subject: Option<String>,
    pub expires_at: Timestamp,
    pub consumed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for issuing a new onboarding token.
#[derive(Debug)]
pub struct CreateOnboardingToken {
    pub token_hash: String,
    pub client_id: DbId,
    pub created_by: DbId,
    pub language: String,
    pub custom_message: Option<String>,
    pub custom_subject: Option<String>,
    pub expires_at: Timestamp,
}
