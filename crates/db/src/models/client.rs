//! Client entity model and DTOs.
//!
//! Clients are owned by a single advisor. This workflow only reads them,
//! except for the onboarding submission which fills the profile.

use gervis_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `clients` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Client {
    pub id: DbId,
    pub advisor_id: DbId,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub is_onboarded: bool,
    pub onboarded_at: Option<Timestamp>,
    pub segment: Option<String>,
    pub net_worth: Option<f64>,
    pub profile_json: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Client {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Email address, if present and not blank.
    pub fn contact_email(&self) -> Option<&str> {
        self.email.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }
}

/// DTO for creating a client.
#[derive(Debug)]
pub struct CreateClient {
    pub advisor_id: DbId,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// A row from the `client_assets` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ClientAsset {
    pub id: DbId,
    pub client_id: DbId,
    pub category: String,
    pub value: f64,
    pub description: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for one asset row written with an onboarding submission.
#[derive(Debug, Clone)]
pub struct CreateClientAsset {
    pub category: String,
    pub value: f64,
    pub description: Option<String>,
}

/// Everything written when an onboarding questionnaire is accepted.
///
/// `None` name/phone fields keep the values the advisor entered.
#[derive(Debug, Clone)]
pub struct CompleteOnboarding {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub segment: String,
    pub net_worth: f64,
    pub profile_json: serde_json::Value,
    pub assets: Vec<CreateClientAsset>,
}
