//! Repository for the append-only `client_logs` table.

use gervis_core::types::DbId;
use sqlx::PgPool;

use crate::models::client_log::{ClientLog, CreateClientLog};

const COLUMNS: &str = "id, client_id, user_id, log_type, content, details_json, created_at";

pub struct ClientLogRepo;

impl ClientLogRepo {
    /// Append a log entry.
    pub async fn create(pool: &PgPool, input: &CreateClientLog) -> Result<ClientLog, sqlx::Error> {
        let query = format!(
            "INSERT INTO client_logs (client_id, user_id, log_type, content, details_json)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ClientLog>(&query)
            .bind(input.client_id)
            .bind(input.user_id)
            .bind(input.log_type)
            .bind(&input.content)
            .bind(&input.details_json)
            .fetch_one(pool)
            .await
    }

    /// List a client's log entries, newest first.
    pub async fn list_by_client(
        pool: &PgPool,
        client_id: DbId,
    ) -> Result<Vec<ClientLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM client_logs
             WHERE client_id = $1
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, ClientLog>(&query)
            .bind(client_id)
            .fetch_all(pool)
            .await
    }
}
