//! Advisor-to-client ownership check shared by every advisor-facing handler.

use gervis_core::error::CoreError;
use gervis_core::types::DbId;
use gervis_db::models::client::Client;
use gervis_db::repositories::ClientRepo;
use gervis_db::DbPool;

use crate::error::AppResult;

/// Load `client_id` and ensure it belongs to `advisor_id`.
///
/// Missing clients are 404; clients of another advisor are 403.
pub async fn owned_client(pool: &DbPool, client_id: DbId, advisor_id: DbId) -> AppResult<Client> {
    let client = ClientRepo::find_by_id(pool, client_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Client", client_id))?;

    if client.advisor_id != advisor_id {
        tracing::warn!(client_id, advisor_id, "Advisor attempted to access a foreign client");
        return Err(CoreError::Forbidden("Client belongs to another advisor".into()).into());
    }

    Ok(client)
}
