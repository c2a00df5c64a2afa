//! HTTP handlers, one module per resource.

pub mod auth;
pub mod client_logs;
pub mod documents;
pub mod onboarding;
pub mod onboarding_tokens;
pub mod secured_files;
pub mod signature_sessions;
pub mod smtp_settings;
pub mod verification;
