//! Gervis domain core.
//!
//! Pure domain logic for the client onboarding and signature workflow, with
//! no database or HTTP dependencies:
//!
//! - [`signature`] -- signature session state machine and lazy expiry.
//! - [`tokens`] -- bearer credential minting and constant-time comparison.
//! - [`onboarding`] -- questionnaire normalization, net worth and segment.
//! - [`storage`] -- per-client file layout and URL scheme.
//! - [`stamping`] -- attestation page generation and PDF merge.
//! - [`credentials`] -- sealing of stored SMTP passwords.

pub mod client_log;
pub mod credentials;
pub mod error;
pub mod hashing;
pub mod onboarding;
pub mod signature;
pub mod stamping;
pub mod storage;
pub mod tokens;
pub mod types;
