//! Public onboarding form endpoints (`/onboarding?token=...`).
//!
//! The token in the link is the only credential. Unknown, consumed, and
//! expired tokens all produce the same [`AppError::InvalidLink`].

use axum::extract::{Query, State};
use axum::Json;
use gervis_core::onboarding::{normalize, OnboardingForm};
use gervis_core::tokens::hash_onboarding_token;
use gervis_core::types::DbId;
use gervis_db::models::client::{Client, CompleteOnboarding, CreateClientAsset};
use gervis_db::models::onboarding_token::OnboardingToken;
use gervis_db::repositories::{ClientRepo, OnboardingCompletion, OnboardingTokenRepo};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

/// What the form needs to render before the client fills it in.
#[derive(Debug, Serialize)]
pub struct OnboardingSummary {
    pub client_id: DbId,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub language: String,
    pub already_onboarded: bool,
}

#[derive(Debug, Serialize)]
pub struct OnboardingAccepted {
    pub success: bool,
    pub segment: &'static str,
    pub net_worth: f64,
}

// ---------------------------------------------------------------------------
// GET /onboarding?token=
// ---------------------------------------------------------------------------

pub async fn resolve_token(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> AppResult<Json<DataResponse<OnboardingSummary>>> {
    let (token, client) = active_token(&state, query.token.as_deref()).await?;

    Ok(Json(DataResponse {
        data: OnboardingSummary {
            client_id: client.id,
            already_onboarded: client.is_onboarded,
            first_name: client.first_name,
            last_name: client.last_name,
            email: client.email,
            phone: client.phone,
            language: token.language,
        },
    }))
}

// ---------------------------------------------------------------------------
// POST /onboarding?token=
// ---------------------------------------------------------------------------

pub async fn submit(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
    Json(form): Json<OnboardingForm>,
) -> AppResult<Json<DataResponse<OnboardingAccepted>>> {
    let (token, client) = active_token(&state, query.token.as_deref()).await?;

    if client.is_onboarded {
        return Err(AppError::AlreadyOnboarded);
    }

    let profile = normalize(form)?;
    let profile_json = serde_json::to_value(&profile)
        .map_err(|e| AppError::InternalError(format!("Failed to serialize profile: {e}")))?;

    let input = CompleteOnboarding {
        first_name: profile.first_name.clone(),
        last_name: profile.last_name.clone(),
        phone: profile.phone.clone(),
        segment: profile.segment.to_string(),
        net_worth: profile.net_worth,
        profile_json,
        assets: profile
            .assets
            .iter()
            .map(|a| CreateClientAsset {
                category: a.category.clone(),
                value: a.value,
                description: a.description.clone(),
            })
            .collect(),
    };

    match ClientRepo::complete_onboarding(&state.pool, &token.token_hash, &input).await? {
        OnboardingCompletion::Completed(client) => {
            tracing::info!(
                client_id = client.id,
                segment = profile.segment,
                "Onboarding questionnaire accepted"
            );
            Ok(Json(DataResponse {
                data: OnboardingAccepted {
                    success: true,
                    segment: profile.segment,
                    net_worth: profile.net_worth,
                },
            }))
        }
        OnboardingCompletion::AlreadyOnboarded => Err(AppError::AlreadyOnboarded),
        OnboardingCompletion::TokenUnavailable => Err(AppError::InvalidLink),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn active_token(
    state: &AppState,
    presented: Option<&str>,
) -> AppResult<(OnboardingToken, Client)> {
    let presented = presented
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AppError::InvalidLink)?;

    let token = OnboardingTokenRepo::find_active_by_hash(
        &state.pool,
        &hash_onboarding_token(presented),
    )
    .await?
    .ok_or(AppError::InvalidLink)?;

    let client = ClientRepo::find_by_id(&state.pool, token.client_id)
        .await?
        .ok_or(AppError::InvalidLink)?;

    Ok((token, client))
}
