//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A create DTO for inserts

pub mod client;
pub mod client_log;
pub mod onboarding_token;
pub mod session;
pub mod signature_session;
pub mod smtp_setting;
pub mod user;
pub mod verified_document;
