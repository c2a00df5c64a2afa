use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gervis_core::error::CoreError;
use gervis_core::signature::SessionStatus;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `gervis_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),

    /// Identity verification already ran for this signature session.
    #[error("Identity already verified for this session")]
    AlreadyVerified,

    /// The signature session reached a terminal status other than expiry.
    #[error("Signature session is {}", status.as_str())]
    SessionClosed { status: SessionStatus },

    /// The client already submitted the onboarding questionnaire.
    #[error("Client has already completed onboarding")]
    AlreadyOnboarded,

    /// A public link whose token is unknown, consumed, or expired.
    ///
    /// Deliberately says nothing about which of those it was.
    #[error("Invalid or expired link")]
    InvalidLink,
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut extra = serde_json::Map::new();

        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Expired(msg) => (StatusCode::GONE, "EXPIRED", msg.clone()),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::Upstream(msg) => {
                    tracing::warn!(error = %msg, "Upstream failure");
                    (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", msg.clone())
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            // --- Database errors ---
            AppError::Database(err) => classify_sqlx_error(err),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::AlreadyVerified => {
                extra.insert("already_verified".into(), json!(true));
                (StatusCode::CONFLICT, "ALREADY_VERIFIED", self.to_string())
            }
            AppError::SessionClosed { status } => {
                extra.insert("status".into(), json!(status));
                (StatusCode::CONFLICT, "SESSION_CLOSED", self.to_string())
            }
            AppError::AlreadyOnboarded => {
                extra.insert("already_onboarded".into(), json!(true));
                (StatusCode::CONFLICT, "ALREADY_ONBOARDED", self.to_string())
            }
            AppError::InvalidLink => (StatusCode::NOT_FOUND, "INVALID_LINK", self.to_string()),
        };

        let mut body = serde_json::Map::new();
        body.insert("error".into(), json!(message));
        body.insert("code".into(), json!(code));
        body.extend(extra);

        (status, axum::Json(serde_json::Value::Object(body))).into_response()
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
        other => {
            tracing::error!(error = %other, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}

/// Map `validator` failures onto the domain validation error.
impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Core(CoreError::Validation(errors.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;

    async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn already_verified_carries_flag() {
        let (status, body) = render(AppError::AlreadyVerified).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["already_verified"], true);
        assert_eq!(body["code"], "ALREADY_VERIFIED");
    }

    #[tokio::test]
    async fn session_closed_reports_status() {
        let (status, body) = render(AppError::SessionClosed {
            status: SessionStatus::Rejected,
        })
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["status"], "rejected");
    }

    #[tokio::test]
    async fn expired_maps_to_gone() {
        let (status, body) = render(CoreError::Expired("link expired".into()).into()).await;
        assert_eq!(status, StatusCode::GONE);
        assert_eq!(body["error"], "link expired");
    }

    #[tokio::test]
    async fn internal_detail_is_not_leaked() {
        let (status, body) = render(AppError::InternalError("disk on fire".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "An internal error occurred");
    }
}
