use std::sync::Arc;

use gervis_core::credentials::CredentialSealer;
use gervis_mail::Mailer;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: gervis_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Outgoing mail; swapped for a recording double in tests.
    pub mailer: Arc<dyn Mailer>,
    /// Seals and opens stored SMTP passwords.
    pub sealer: Arc<CredentialSealer>,
}
