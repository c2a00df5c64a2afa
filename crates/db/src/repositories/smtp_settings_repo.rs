//! Repository for the `smtp_settings` table (one row per advisor).

use gervis_core::types::DbId;
use sqlx::PgPool;

use crate::models::smtp_setting::{SmtpSetting, UpsertSmtpSetting};

const COLUMNS: &str = "id, user_id, host, port, secure, username, password_sealed, \
                        from_address, from_name, created_at, updated_at";

pub struct SmtpSettingsRepo;

impl SmtpSettingsRepo {
    pub async fn find_by_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<SmtpSetting>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM smtp_settings WHERE user_id = $1");
        sqlx::query_as::<_, SmtpSetting>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Insert or replace the advisor's settings.
    ///
    /// A `None` password keeps the stored one.
    pub async fn upsert(
        pool: &PgPool,
        user_id: DbId,
        input: &UpsertSmtpSetting,
    ) -> Result<SmtpSetting, sqlx::Error> {
        let query = format!(
            "INSERT INTO smtp_settings
                (user_id, host, port, secure, username, password_sealed, from_address, from_name)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (user_id) DO UPDATE SET
                host = EXCLUDED.host,
                port = EXCLUDED.port,
                secure = EXCLUDED.secure,
                username = EXCLUDED.username,
                password_sealed = COALESCE(EXCLUDED.password_sealed, smtp_settings.password_sealed),
                from_address = EXCLUDED.from_address,
                from_name = EXCLUDED.from_name
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SmtpSetting>(&query)
            .bind(user_id)
            .bind(&input.host)
            .bind(input.port)
            .bind(input.secure)
            .bind(&input.username)
            .bind(&input.password_sealed)
            .bind(&input.from_address)
            .bind(&input.from_name)
            .fetch_one(pool)
            .await
    }

    /// Returns `true` if a row was deleted.
    pub async fn delete(pool: &PgPool, user_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM smtp_settings WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
