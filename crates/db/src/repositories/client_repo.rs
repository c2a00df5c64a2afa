//! Repository for the `clients` and `client_assets` tables.

use gervis_core::client_log::LOG_ONBOARDING_COMPLETED;
use gervis_core::types::DbId;
use sqlx::PgPool;

use crate::models::client::{Client, ClientAsset, CompleteOnboarding, CreateClient};

const COLUMNS: &str = "id, advisor_id, first_name, last_name, email, phone, is_onboarded, \
                        onboarded_at, segment, net_worth, profile_json, created_at, updated_at";

const ASSET_COLUMNS: &str = "id, client_id, category, value, description, created_at, updated_at";

/// Result of an onboarding submission attempt.
#[derive(Debug)]
pub enum OnboardingCompletion {
    /// Token consumed, profile stored.
    Completed(Client),
    /// The token was unknown, expired, or already consumed. Nothing was written.
    TokenUnavailable,
    /// The client was onboarded through another link. Nothing was written.
    AlreadyOnboarded,
}

pub struct ClientRepo;

impl ClientRepo {
    pub async fn create(pool: &PgPool, input: &CreateClient) -> Result<Client, sqlx::Error> {
        let query = format!(
            "INSERT INTO clients (advisor_id, first_name, last_name, email, phone)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Client>(&query)
            .bind(input.advisor_id)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.email)
            .bind(&input.phone)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Client>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM clients WHERE id = $1");
        sqlx::query_as::<_, Client>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_assets(
        pool: &PgPool,
        client_id: DbId,
    ) -> Result<Vec<ClientAsset>, sqlx::Error> {
        let query = format!(
            "SELECT {ASSET_COLUMNS} FROM client_assets WHERE client_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, ClientAsset>(&query)
            .bind(client_id)
            .fetch_all(pool)
            .await
    }

    /// Consume the onboarding token and store the questionnaire in one transaction.
    ///
    /// The token is claimed with a conditional update, so two concurrent
    /// submissions with the same link cannot both succeed. The client update
    /// is likewise gated on `is_onboarded = false`; if either gate fails the
    /// transaction is rolled back and the token stays usable.
    pub async fn complete_onboarding(
        pool: &PgPool,
        token_hash: &str,
        input: &CompleteOnboarding,
    ) -> Result<OnboardingCompletion, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let claimed = sqlx::query_scalar::<_, DbId>(
            "UPDATE onboarding_tokens SET consumed_at = NOW()
             WHERE token_hash = $1
               AND consumed_at IS NULL
               AND expires_at > NOW()
             RETURNING client_id",
        )
        .bind(token_hash)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(client_id) = claimed else {
            tx.rollback().await?;
            return Ok(OnboardingCompletion::TokenUnavailable);
        };

        let query = format!(
            "UPDATE clients SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                phone = COALESCE($4, phone),
                segment = $5,
                net_worth = $6,
                profile_json = $7,
                is_onboarded = true,
                onboarded_at = NOW()
             WHERE id = $1 AND is_onboarded = false
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Client>(&query)
            .bind(client_id)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.phone)
            .bind(&input.segment)
            .bind(input.net_worth)
            .bind(&input.profile_json)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(client) = updated else {
            tx.rollback().await?;
            return Ok(OnboardingCompletion::AlreadyOnboarded);
        };

        for asset in &input.assets {
            sqlx::query(
                "INSERT INTO client_assets (client_id, category, value, description)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(client_id)
            .bind(&asset.category)
            .bind(asset.value)
            .bind(&asset.description)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            "INSERT INTO client_logs (client_id, user_id, log_type, content, details_json)
             VALUES ($1, NULL, $2, $3, $4)",
        )
        .bind(client_id)
        .bind(LOG_ONBOARDING_COMPLETED)
        .bind("Onboarding questionnaire completed by the client")
        .bind(serde_json::json!({
            "segment": input.segment,
            "net_worth": input.net_worth,
            "asset_count": input.assets.len(),
        }))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(OnboardingCompletion::Completed(client))
    }
}
