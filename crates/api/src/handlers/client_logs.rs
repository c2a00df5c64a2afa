//! Client interaction log (`GET /clients/{client_id}/logs`).

use axum::extract::{Path, State};
use axum::Json;
use gervis_core::types::DbId;
use gervis_db::models::client_log::ClientLog;
use gervis_db::repositories::ClientLogRepo;

use crate::access::owned_client;
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Newest entries first.
pub async fn list_logs(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(client_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<ClientLog>>>> {
    owned_client(&state.pool, client_id, auth.user_id).await?;
    let logs = ClientLogRepo::list_by_client(&state.pool, client_id).await?;
    Ok(Json(DataResponse { data: logs }))
}
