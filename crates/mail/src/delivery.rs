//! Email delivery via SMTP.
//!
//! Unlike a process-wide mail configuration, every advisor sends through
//! their own SMTP server, so transport settings travel with each call to
//! [`Mailer::send`].

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),

    /// The advisor has not configured an SMTP server.
    #[error("SMTP settings are not configured")]
    NotConfigured,
}

// ---------------------------------------------------------------------------
// Settings and message
// ---------------------------------------------------------------------------

/// Connection settings for one advisor's SMTP server, with the password
/// already unsealed.
#[derive(Clone)]
pub struct SmtpTransportSettings {
    pub host: String,
    pub port: u16,
    /// `true` for implicit TLS (usually port 465), `false` for STARTTLS.
    pub secure: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_address: String,
    pub from_name: Option<String>,
}

impl std::fmt::Debug for SmtpTransportSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpTransportSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("secure", &self.secure)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("from_address", &self.from_address)
            .finish()
    }
}

/// A plain-text email ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

// ---------------------------------------------------------------------------
// Mailer
// ---------------------------------------------------------------------------

/// Sends a single email through the given transport settings.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(
        &self,
        settings: &SmtpTransportSettings,
        email: &OutgoingEmail,
    ) -> Result<(), EmailError>;
}

/// [`Mailer`] backed by `lettre`'s async SMTP transport.
#[derive(Debug, Default, Clone, Copy)]
pub struct SmtpMailer;

impl SmtpMailer {
    /// Assemble the MIME message without sending it.
    pub fn build_message(
        settings: &SmtpTransportSettings,
        email: &OutgoingEmail,
    ) -> Result<Message, EmailError> {
        let from = Mailbox::new(settings.from_name.clone(), settings.from_address.parse()?);

        Message::builder()
            .from(from)
            .to(Mailbox::new(None, email.to.parse()?))
            .subject(email.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())
            .map_err(|e| EmailError::Build(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(
        &self,
        settings: &SmtpTransportSettings,
        email: &OutgoingEmail,
    ) -> Result<(), EmailError> {
        let message = Self::build_message(settings, email)?;

        let mut transport_builder = if settings.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)?
        }
        .port(settings.port);

        if let (Some(user), Some(pass)) = (&settings.username, &settings.password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let transport = transport_builder.build();
        transport.send(message).await?;

        tracing::info!(to = %email.to, host = %settings.host, "Email sent");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
