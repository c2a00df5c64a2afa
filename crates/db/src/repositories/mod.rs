//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod client_log_repo;
pub mod client_repo;
pub mod onboarding_token_repo;
pub mod session_repo;
pub mod signature_session_repo;
pub mod smtp_settings_repo;
pub mod user_repo;
pub mod verified_document_repo;

pub use client_log_repo::ClientLogRepo;
pub use client_repo::{ClientRepo, OnboardingCompletion};
pub use onboarding_token_repo::OnboardingTokenRepo;
pub use session_repo::SessionRepo;
pub use signature_session_repo::{SessionCompletion, SignatureSessionRepo};
pub use smtp_settings_repo::SmtpSettingsRepo;
pub use user_repo::UserRepo;
pub use verified_document_repo::VerifiedDocumentRepo;
