//! Per-advisor SMTP transport settings.

use gervis_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `smtp_settings` table.
#[derive(Debug, Clone, FromRow)]
pub struct SmtpSetting {
    pub id: DbId,
    pub user_id: DbId,
    pub host: String,
    pub port: i32,
    pub secure: bool,
    pub username: Option<String>,
    pub password_sealed: Option<Vec<u8>>,
    pub from_address: String,
    pub from_name: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Safe representation for API responses: the password never leaves the server.
#[derive(Debug, Clone, Serialize)]
pub struct SmtpSettingResponse {
    pub host: String,
    pub port: i32,
    pub secure: bool,
    pub username: Option<String>,
    pub has_password: bool,
    pub from_address: String,
    pub from_name: Option<String>,
    pub updated_at: Timestamp,
}

impl From<&SmtpSetting> for SmtpSettingResponse {
    fn from(s: &SmtpSetting) -> Self {
        Self {
            host: s.host.clone(),
            port: s.port,
            secure: s.secure,
            username: s.username.clone(),
            has_password: s.password_sealed.is_some(),
            from_address: s.from_address.clone(),
            from_name: s.from_name.clone(),
            updated_at: s.updated_at,
        }
    }
}

/// DTO for inserting or replacing an advisor's SMTP settings.
#[derive(Debug)]
pub struct UpsertSmtpSetting {
    pub host: String,
    pub port: i32,
    pub secure: bool,
    pub username: Option<String>,
    /// `None` keeps the currently stored password.
    pub password_sealed: Option<Vec<u8>>,
    pub from_address: String,
    pub from_name: Option<String>,
}
