//! Onboarding questionnaire normalization and validation.
//!
//! The public form submits a loosely-filled payload. [`normalize`] turns it
//! into the canonical profile that gets persisted:
//!
//! - numeric fields default to `0` when absent;
//! - 1-5 interest scales default to `3` (neutral) when absent or zero;
//! - asset entries with a value `<= 0` are dropped;
//! - every asset category the client declares to hold must have at least one
//!   submitted entry (checked before the drop above);
//! - net worth and segment are derived from what remains.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Neutral value for an unanswered interest scale.
pub const NEUTRAL_INTEREST: u8 = 3;

/// Upper bound of an interest scale.
pub const MAX_INTEREST: u8 = 5;

pub const ASSET_REAL_ESTATE: &str = "real_estate";
pub const ASSET_CASH: &str = "cash";
pub const ASSET_STOCKS: &str = "stocks";
pub const ASSET_BONDS: &str = "bonds";
pub const ASSET_FUNDS: &str = "funds";
pub const ASSET_PENSION: &str = "pension";
pub const ASSET_CRYPTO: &str = "crypto";
pub const ASSET_OTHER: &str = "other";

/// All valid asset categories.
pub const VALID_ASSET_CATEGORIES: &[&str] = &[
    ASSET_REAL_ESTATE,
    ASSET_CASH,
    ASSET_STOCKS,
    ASSET_BONDS,
    ASSET_FUNDS,
    ASSET_PENSION,
    ASSET_CRYPTO,
    ASSET_OTHER,
];

/// Valid MIFID risk profiles, from most to least cautious.
pub const VALID_RISK_PROFILES: &[&str] =
    &["conservative", "moderate", "balanced", "growth", "aggressive"];

/// Valid self-declared investment experience levels.
pub const VALID_EXPERIENCE_LEVELS: &[&str] = &["none", "limited", "good", "extensive"];

pub const SEGMENT_PRIVATE: &str = "private";
pub const SEGMENT_AFFLUENT: &str = "affluent";
pub const SEGMENT_MASS_AFFLUENT: &str = "mass_affluent";
pub const SEGMENT_RETAIL: &str = "retail";

/// Net worth floor of each segment, highest first.
const SEGMENT_THRESHOLDS: &[(f64, &str)] = &[
    (1_000_000.0, SEGMENT_PRIVATE),
    (250_000.0, SEGMENT_AFFLUENT),
    (50_000.0, SEGMENT_MASS_AFFLUENT),
];

// ---------------------------------------------------------------------------
// Submitted payload
// ---------------------------------------------------------------------------

/// Questionnaire payload exactly as the public form sends it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OnboardingForm {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<chrono::NaiveDate>,
    pub address: Option<String>,
    pub fiscal_code: Option<String>,
    pub profession: Option<String>,

    pub annual_income: Option<f64>,
    pub monthly_expenses: Option<f64>,
    pub liabilities: Option<f64>,
    pub dependents: Option<f64>,
    pub investment_horizon_years: Option<f64>,

    pub interests: InterestAnswers,

    pub risk_profile: Option<String>,
    pub investment_experience: Option<String>,
    pub investment_goals: Vec<String>,
    pub accepts_capital_loss: Option<bool>,

    /// Categories the client declares to hold.
    pub asset_categories: Vec<String>,
    pub assets: Vec<AssetEntry>,
}

/// 1-5 answers; `None` and `0` both mean "not answered".
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InterestAnswers {
    pub retirement: Option<u8>,
    pub wealth_growth: Option<u8>,
    pub income: Option<u8>,
    pub capital_protection: Option<u8>,
    pub estate_planning: Option<u8>,
    pub tax_optimization: Option<u8>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AssetEntry {
    pub category: String,
    pub value: Option<f64>,
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Normalized profile
// ---------------------------------------------------------------------------

/// Canonical onboarding profile, stored as the client's `profile_json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OnboardingProfile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<chrono::NaiveDate>,
    pub address: Option<String>,
    pub fiscal_code: Option<String>,
    pub profession: Option<String>,

    pub annual_income: f64,
    pub monthly_expenses: f64,
    pub liabilities: f64,
    pub dependents: f64,
    pub investment_horizon_years: f64,

    pub interests: InterestProfile,
    pub mifid: MifidProfile,

    #[serde(skip)]
    pub assets: Vec<NormalizedAsset>,
    pub net_worth: f64,
    pub segment: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterestProfile {
    pub retirement: u8,
    pub wealth_growth: u8,
    pub income: u8,
    pub capital_protection: u8,
    pub estate_planning: u8,
    pub tax_optimization: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MifidProfile {
    pub risk_profile: Option<String>,
    pub investment_experience: Option<String>,
    pub investment_goals: Vec<String>,
    pub accepts_capital_loss: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedAsset {
    pub category: String,
    pub value: f64,
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Validate and normalize a submitted questionnaire.
pub fn normalize(form: OnboardingForm) -> Result<OnboardingProfile, CoreError> {
    validate_assets(&form.asset_categories, &form.assets)?;

    let annual_income = non_negative(form.annual_income, "annual_income")?;
    let monthly_expenses = non_negative(form.monthly_expenses, "monthly_expenses")?;
    let liabilities = non_negative(form.liabilities, "liabilities")?;
    let dependents = non_negative(form.dependents, "dependents")?;
    let investment_horizon_years =
        non_negative(form.investment_horizon_years, "investment_horizon_years")?;

    let interests = normalize_interests(&form.interests)?;

    let risk_profile = optional_known(form.risk_profile, VALID_RISK_PROFILES, "risk profile")?;
    let investment_experience = optional_known(
        form.investment_experience,
        VALID_EXPERIENCE_LEVELS,
        "investment experience",
    )?;

    let assets: Vec<NormalizedAsset> = form
        .assets
        .into_iter()
        .filter_map(|entry| {
            let value = entry.value.unwrap_or(0.0);
            (value > 0.0).then(|| NormalizedAsset {
                category: entry.category,
                value,
                description: non_blank(entry.description),
            })
        })
        .collect();

    let net_worth = assets.iter().map(|a| a.value).sum::<f64>() - liabilities;

    Ok(OnboardingProfile {
        first_name: non_blank(form.first_name),
        last_name: non_blank(form.last_name),
        phone: non_blank(form.phone),
        birth_date: form.birth_date,
        address: non_blank(form.address),
        fiscal_code: non_blank(form.fiscal_code).map(|c| c.to_uppercase()),
        profession: non_blank(form.profession),
        annual_income,
        monthly_expenses,
        liabilities,
        dependents,
        investment_horizon_years,
        interests,
        mifid: MifidProfile {
            risk_profile,
            investment_experience,
            investment_goals: form
                .investment_goals
                .into_iter()
                .filter(|g| !g.trim().is_empty())
                .collect(),
            accepts_capital_loss: form.accepts_capital_loss.unwrap_or(false),
        },
        assets,
        net_worth,
        segment: segment_for(net_worth),
    })
}

/// Map a net worth to its client segment.
pub fn segment_for(net_worth: f64) -> &'static str {
    SEGMENT_THRESHOLDS
        .iter()
        .find(|(floor, _)| net_worth >= *floor)
        .map(|(_, segment)| *segment)
        .unwrap_or(SEGMENT_RETAIL)
}

fn validate_assets(held: &[String], entries: &[AssetEntry]) -> Result<(), CoreError> {
    for category in held.iter().chain(entries.iter().map(|e| &e.category)) {
        if !VALID_ASSET_CATEGORIES.contains(&category.as_str()) {
            return Err(CoreError::Validation(format!(
                "Invalid asset category '{category}'. Must be one of: {VALID_ASSET_CATEGORIES:?}"
            )));
        }
    }
    for category in held {
        if !entries.iter().any(|e| &e.category == category) {
            return Err(CoreError::Validation(format!(
                "At least one asset entry is required for held category '{category}'"
            )));
        }
    }
    Ok(())
}

fn normalize_interests(answers: &InterestAnswers) -> Result<InterestProfile, CoreError> {
    Ok(InterestProfile {
        retirement: interest(answers.retirement, "retirement")?,
        wealth_growth: interest(answers.wealth_growth, "wealth_growth")?,
        income: interest(answers.income, "income")?,
        capital_protection: interest(answers.capital_protection, "capital_protection")?,
        estate_planning: interest(answers.estate_planning, "estate_planning")?,
        tax_optimization: interest(answers.tax_optimization, "tax_optimization")?,
    })
}

fn interest(value: Option<u8>, field: &str) -> Result<u8, CoreError> {
    match value {
        None | Some(0) => Ok(NEUTRAL_INTEREST),
        Some(v) if v <= MAX_INTEREST => Ok(v),
        Some(v) => Err(CoreError::Validation(format!(
            "Interest '{field}' must be between 1 and {MAX_INTEREST}, got {v}"
        ))),
    }
}

fn non_negative(value: Option<f64>, field: &str) -> Result<f64, CoreError> {
    let value = value.unwrap_or(0.0);
    if value < 0.0 {
        return Err(CoreError::Validation(format!(
            "Field '{field}' must not be negative"
        )));
    }
    Ok(value)
}

fn optional_known(
    value: Option<String>,
    valid: &[&str],
    label: &str,
) -> Result<Option<String>, CoreError> {
    match non_blank(value) {
        None => Ok(None),
        Some(v) if valid.contains(&v.as_str()) => Ok(Some(v)),
        Some(v) => Err(CoreError::Validation(format!(
            "Invalid {label} '{v}'. Must be one of: {valid:?}"
        ))),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
