//! Handlers for the advisor's own SMTP transport (`/user/smtp-settings`).
//!
//! The password is sealed before it reaches the database and is never
//! returned; responses only report `has_password`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use gervis_core::error::CoreError;
use gervis_core::types::DbId;
use gervis_db::models::smtp_setting::{SmtpSettingResponse, UpsertSmtpSetting};
use gervis_db::repositories::SmtpSettingsRepo;
use gervis_mail::SmtpTransportSettings;
use serde::Deserialize;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `PUT /user/smtp-settings`.
#[derive(Debug, Deserialize, Validate)]
pub struct SmtpSettingsRequest {
    #[validate(length(min = 1, max = 255))]
    pub host: String,
    #[validate(range(min = 1))]
    pub port: u16,
    #[serde(default)]
    pub secure: bool,
    pub username: Option<String>,
    /// Omit to keep the stored password.
    pub password: Option<String>,
    #[validate(email)]
    pub from_address: String,
    pub from_name: Option<String>,
}

// ---------------------------------------------------------------------------
// GET /user/smtp-settings
// ---------------------------------------------------------------------------

pub async fn get_settings(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<DataResponse<SmtpSettingResponse>>> {
    let settings = SmtpSettingsRepo::find_by_user(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| CoreError::not_found("SmtpSettings", auth.user_id))?;
    Ok(Json(DataResponse {
        data: SmtpSettingResponse::from(&settings),
    }))
}

// ---------------------------------------------------------------------------
// PUT /user/smtp-settings
// ---------------------------------------------------------------------------

pub async fn put_settings(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<SmtpSettingsRequest>,
) -> AppResult<Json<DataResponse<SmtpSettingResponse>>> {
    input.validate()?;

    let password_sealed = match input.password.as_deref().filter(|p| !p.is_empty()) {
        Some(password) => Some(state.sealer.seal(password)?),
        None => None,
    };

    let upsert = UpsertSmtpSetting {
        host: input.host.trim().to_string(),
        port: i32::from(input.port),
        secure: input.secure,
        username: non_blank(input.username),
        password_sealed,
        from_address: input.from_address.trim().to_string(),
        from_name: non_blank(input.from_name),
    };

    let saved = SmtpSettingsRepo::upsert(&state.pool, auth.user_id, &upsert).await?;
    tracing::info!(user_id = auth.user_id, host = %saved.host, "SMTP settings saved");

    Ok(Json(DataResponse {
        data: SmtpSettingResponse::from(&saved),
    }))
}

// ---------------------------------------------------------------------------
// DELETE /user/smtp-settings
// ---------------------------------------------------------------------------

pub async fn delete_settings(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<StatusCode> {
    if !SmtpSettingsRepo::delete(&state.pool, auth.user_id).await? {
        return Err(CoreError::not_found("SmtpSettings", auth.user_id).into());
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Load and unseal an advisor's transport settings, if configured.
pub async fn transport_settings_for(
    state: &AppState,
    user_id: DbId,
) -> AppResult<Option<SmtpTransportSettings>> {
    let Some(row) = SmtpSettingsRepo::find_by_user(&state.pool, user_id).await? else {
        return Ok(None);
    };

    let password = match &row.password_sealed {
        Some(sealed) => Some(state.sealer.open(sealed)?),
        None => None,
    };

    let port = u16::try_from(row.port)
        .map_err(|_| CoreError::Internal(format!("Stored SMTP port {} out of range", row.port)))?;

    Ok(Some(SmtpTransportSettings {
        host: row.host,
        port,
        secure: row.secure,
        username: row.username,
        password,
        from_address: row.from_address,
        from_name: row.from_name,
    }))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
