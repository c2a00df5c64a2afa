//! Outgoing email for the advisor workflow.
//!
//! - [`delivery`]: the [`Mailer`] seam and its SMTP implementation.
//! - [`templates`]: onboarding invitation bodies per language.

pub mod delivery;
pub mod templates;

pub use delivery::{EmailError, Mailer, OutgoingEmail, SmtpMailer, SmtpTransportSettings};
pub use templates::{render_onboarding_invitation, InvitationEmail};
