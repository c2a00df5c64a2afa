//! Handler for issuing onboarding links (`POST /onboarding-tokens`).
//!
//! Issuing the link and notifying the client are independent: a failed email
//! never invalidates the token, the advisor gets the link back either way.

use axum::extract::State;
use axum::Json;
use chrono::Duration;
use gervis_core::client_log::LOG_ONBOARDING_LINK_SENT;
use gervis_core::error::CoreError;
use gervis_core::tokens::{generate_onboarding_token, now, onboarding_link};
use gervis_core::types::{DbId, Timestamp};
use gervis_db::models::client::Client;
use gervis_db::models::client_log::CreateClientLog;
use gervis_db::models::onboarding_token::CreateOnboardingToken;
use gervis_db::repositories::{ClientLogRepo, OnboardingTokenRepo, UserRepo};
use gervis_mail::{render_onboarding_invitation, OutgoingEmail};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::access::owned_client;
use crate::error::{AppError, AppResult};
use crate::handlers::smtp_settings::transport_settings_for;
use crate::middleware::auth::AuthUser;
use crate::response::{created, Created};
use crate::state::AppState;

const DEFAULT_LANGUAGE: &str = "it";

/// Request body for `POST /onboarding-tokens`.
#[derive(Debug, Deserialize, Validate)]
pub struct IssueTokenRequest {
    pub client_id: DbId,
    #[validate(length(min = 2, max = 8))]
    pub language: Option<String>,
    #[validate(length(max = 4000))]
    pub custom_message: Option<String>,
    #[validate(length(max = 255))]
    pub custom_subject: Option<String>,
    #[serde(default)]
    pub send_email: bool,
}

#[derive(Debug, Serialize)]
pub struct IssuedToken {
    pub success: bool,
    pub token: String,
    pub link: String,
    pub expires_at: Timestamp,
    pub email_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_error: Option<String>,
}

// ---------------------------------------------------------------------------
// POST /onboarding-tokens
// ---------------------------------------------------------------------------

pub async fn issue_token(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<IssueTokenRequest>,
) -> AppResult<Created<IssuedToken>> {
    input.validate()?;

    let client = owned_client(&state.pool, input.client_id, auth.user_id).await?;

    if input.send_email && client.contact_email().is_none() {
        return Err(CoreError::Validation("Client has no email address".into()).into());
    }

    let language = input
        .language
        .as_deref()
        .map(|l| l.trim().to_ascii_lowercase())
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

    let generated = generate_onboarding_token();
    let expires_at = now() + Duration::days(state.config.onboarding_token_ttl_days);

    OnboardingTokenRepo::create(
        &state.pool,
        &CreateOnboardingToken {
            token_hash: generated.hash,
            client_id: client.id,
            created_by: auth.user_id,
            language: language.clone(),
            custom_message: input.custom_message.clone(),
            custom_subject: input.custom_subject.clone(),
            expires_at,
        },
    )
    .await?;

    let link = onboarding_link(&state.config.public_base_url, &generated.plaintext);
    tracing::info!(client_id = client.id, user_id = auth.user_id, "Onboarding link issued");

    let (email_sent, email_error) = if input.send_email {
        match deliver_invitation(&state, auth.user_id, &client, &language, &link, &input).await {
            Ok(()) => (true, None),
            Err(e) => {
                tracing::warn!(client_id = client.id, error = %e, "Onboarding email not sent");
                (false, Some(e.to_string()))
            }
        }
    } else {
        (false, None)
    };

    Ok(created(IssuedToken {
        success: true,
        token: generated.plaintext,
        link,
        expires_at,
        email_sent,
        email_error,
    }))
}

/// Send the invitation through the advisor's SMTP server and log it.
async fn deliver_invitation(
    state: &AppState,
    advisor_id: DbId,
    client: &Client,
    language: &str,
    link: &str,
    input: &IssueTokenRequest,
) -> AppResult<()> {
    let to = client
        .contact_email()
        .ok_or_else(|| CoreError::Validation("Client has no email address".into()))?
        .to_string();

    let settings = transport_settings_for(state, advisor_id)
        .await?
        .ok_or_else(|| CoreError::Upstream(gervis_mail::EmailError::NotConfigured.to_string()))?;

    let advisor_name = UserRepo::find_by_id(&state.pool, advisor_id)
        .await?
        .map(|u| u.full_name)
        .unwrap_or_default();

    let rendered = render_onboarding_invitation(
        language,
        &client.full_name(),
        &advisor_name,
        link,
        input.custom_message.as_deref(),
        input.custom_subject.as_deref(),
    );

    let email = OutgoingEmail {
        to: to.clone(),
        subject: rendered.subject,
        body: rendered.body,
    };
    state
        .mailer
        .send(&settings, &email)
        .await
        .map_err(|e| AppError::Core(CoreError::Upstream(e.to_string())))?;

    // The mail is out; a lost log entry must not report it as unsent.
    if let Err(e) = ClientLogRepo::create(
        &state.pool,
        &CreateClientLog {
            client_id: client.id,
            user_id: Some(advisor_id),
            log_type: LOG_ONBOARDING_LINK_SENT,
            content: format!("Onboarding link sent to {to}"),
            details_json: Some(serde_json::json!({ "language": language })),
        },
    )
    .await
    {
        tracing::warn!(client_id = client.id, error = %e, "Failed to log onboarding email");
    }

    Ok(())
}
