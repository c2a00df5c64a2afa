//! Signature session state machine.
//!
//! ```text
//!            +--> completed
//!  pending --+--> expired
//!            +--> rejected
//! ```
//!
//! Every non-pending status is terminal. Expiry is evaluated lazily: the
//! stored status stays `pending` until a read notices `now > expires_at`,
//! at which point [`effective_status`] reports `expired` and the caller
//! persists that with an idempotent conditional update.

use serde::Serialize;

use crate::error::CoreError;
use crate::types::Timestamp;

/// Lifetime of a signature session.
pub const SESSION_TTL_HOURS: i64 = 24;

/// Status values matching the `signature_session_statuses` seed data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(i16)]
pub enum SessionStatus {
    Pending = 1,
    Completed = 2,
    Expired = 3,
    /// Defined for completeness; nothing in the workflow produces it yet.
    Rejected = 4,
}

impl SessionStatus {
    /// Return the database status ID.
    pub fn id(self) -> i16 {
        self as i16
    }

    /// Parse from the database status ID.
    pub fn from_id(id: i16) -> Result<Self, CoreError> {
        match id {
            1 => Ok(Self::Pending),
            2 => Ok(Self::Completed),
            3 => Ok(Self::Expired),
            4 => Ok(Self::Rejected),
            other => Err(CoreError::Internal(format!(
                "Unknown signature session status id {other}"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Expired => "expired",
            Self::Rejected => "rejected",
        }
    }
}

/// Compute `expires_at` for a session created at `created_at`.
pub fn session_expiry(created_at: Timestamp) -> Timestamp {
    created_at + chrono::Duration::hours(SESSION_TTL_HOURS)
}

/// The status a session actually has at `now`, regardless of what is stored.
///
/// Pure: no I/O, no clock access.
pub fn effective_status(
    stored: SessionStatus,
    expires_at: Timestamp,
    now: Timestamp,
) -> SessionStatus {
    if stored == SessionStatus::Pending && now > expires_at {
        SessionStatus::Expired
    } else {
        stored
    }
}

/// Whether a read at `now` must persist an expiry the storage has not seen yet.
pub fn needs_expiry_write(stored: SessionStatus, effective: SessionStatus) -> bool {
    stored == SessionStatus::Pending && effective == SessionStatus::Expired
}

/// What the mobile client is told about a session it holds a link for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionAvailability {
    Valid,
    Completed,
    Expired,
    Rejected,
}

impl SessionAvailability {
    pub fn message(self) -> &'static str {
        match self {
            Self::Valid => "Session is valid and awaiting identity verification",
            Self::Completed => "Identity verification has already been completed",
            Self::Expired => "This signature link has expired",
            Self::Rejected => "This signature session was rejected",
        }
    }
}

impl From<SessionStatus> for SessionAvailability {
    fn from(status: SessionStatus) -> Self {
        match status {
            SessionStatus::Pending => Self::Valid,
            SessionStatus::Completed => Self::Completed,
            SessionStatus::Expired => Self::Expired,
            SessionStatus::Rejected => Self::Rejected,
        }
    }
}
