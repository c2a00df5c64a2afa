//! Repository for the `onboarding_tokens` table.
//!
//! Only SHA-256 hashes of tokens are stored; lookups take the hash.

use sqlx::PgPool;

use crate::models::onboarding_token::{CreateOnboardingToken, OnboardingToken};

const COLUMNS: &str = "id, token_hash, client_id, created_by, language, custom_message, \
                        custom_subject, expires_at, consumed_at, created_at, updated_at";

pub struct OnboardingTokenRepo;

impl OnboardingTokenRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateOnboardingToken,
    ) -> Result<OnboardingToken, sqlx::Error> {
        let query = format!(
            "INSERT INTO onboarding_tokens
                (token_hash, client_id, created_by, language, custom_message, custom_subject,
                 expires_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OnboardingToken>(&query)
            .bind(&input.token_hash)
            .bind(input.client_id)
            .bind(input.created_by)
            .bind(&input.language)
            .bind(&input.custom_message)
            .bind(&input.custom_subject)
            .bind(input.expires_at)
            .fetch_one(pool)
            .await
    }

    /// Find a token that is neither consumed nor expired.
    ///
    /// Unknown, consumed, and expired tokens are indistinguishable to callers.
    pub async fn find_active_by_hash(
        pool: &PgPool,
        token_hash: &str,
    ) -> Result<Option<OnboardingToken>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM onboarding_tokens
             WHERE token_hash = $1
               AND consumed_at IS NULL
               AND expires_at > NOW()"
        );
        sqlx::query_as::<_, OnboardingToken>(&query)
            .bind(token_hash)
            .fetch_optional(pool)
            .await
    }
}
