//! Interaction log entry types written against a client.

pub const LOG_SIGNATURE_SESSION_CREATED: &str = "signature_session_created";
pub const LOG_IDENTITY_VERIFIED: &str = "identity_verified";
pub const LOG_ONBOARDING_LINK_SENT: &str = "onboarding_link_sent";
pub const LOG_ONBOARDING_COMPLETED: &str = "onboarding_completed";
pub const LOG_DOCUMENT_UPLOADED: &str = "document_uploaded";
