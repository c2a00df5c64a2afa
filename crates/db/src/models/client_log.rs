//! Client interaction log entries. Append-only.

use gervis_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ClientLog {
    pub id: DbId,
    pub client_id: DbId,
    pub user_id: Option<DbId>,
    pub log_type: String,
    pub content: String,
    pub details_json: Option<serde_json::Value>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CreateClientLog {
    pub client_id: DbId,
    pub user_id: Option<DbId>,
    pub log_type: &'static str,
    pub content: String,
    pub details_json: Option<serde_json::Value>,
}
