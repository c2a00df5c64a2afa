//! Request extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated advisor from a JWT Bearer token.

pub mod auth;
