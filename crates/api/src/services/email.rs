//! Outbound notifications.
//!
//! The rest of the service only sees the [`Notifier`] trait. With SMTP
//! configured, [`SmtpNotifier`] sends multipart mail via lettre with Askama
//! templates; otherwise [`LogNotifier`] records that a message would have
//! been sent.

use askama::Template;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use freshcart_core::Email;

use crate::config::EmailConfig;

/// A password-reset email.
#[derive(Clone)]
pub struct PasswordResetMessage {
    /// Greeting name.
    pub name: String,
    /// Link carrying the plaintext token.
    pub reset_url: String,
    pub ttl_minutes: i64,
}

impl std::fmt::Debug for PasswordResetMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordResetMessage")
            .field("name", &self.name)
            .field("reset_url", &"[REDACTED]")
            .field("ttl_minutes", &self.ttl_minutes)
            .finish()
    }
}

/// HTML template for the password-reset email.
#[derive(Template)]
#[template(path = "email/password_reset.html")]
struct PasswordResetEmailHtml<'a> {
    name: &'a str,
    reset_url: &'a str,
    ttl_minutes: i64,
}

/// Plain text template for the password-reset email.
#[derive(Template)]
#[template(path = "email/password_reset.txt")]
struct PasswordResetEmailText<'a> {
    name: &'a str,
    reset_url: &'a str,
    ttl_minutes: i64,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Delivers user-facing notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a password-reset link to `to`.
    ///
    /// # Errors
    ///
    /// Returns `EmailError` if the message cannot be rendered or delivered.
    async fn send_password_reset(
        &self,
        to: &Email,
        message: &PasswordResetMessage,
    ) -> Result<(), EmailError>;
}

/// SMTP delivery.
#[derive(Clone)]
pub struct SmtpNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpNotifier {
    /// Create a new SMTP notifier from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the relay address is invalid.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send_password_reset(
        &self,
        to: &Email,
        message: &PasswordResetMessage,
    ) -> Result<(), EmailError> {
        let (html, text) = render_password_reset(message)?;
        self.send_multipart_email(to.as_str(), "Reset your FreshCart password", &text, &html)
            .await
    }
}

/// Logs instead of sending. Used when SMTP is not configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_password_reset(
        &self,
        to: &Email,
        _message: &PasswordResetMessage,
    ) -> Result<(), EmailError> {
        tracing::info!(to = %to, "SMTP not configured; password reset email not sent");
        Ok(())
    }
}

fn render_password_reset(message: &PasswordResetMessage) -> Result<(String, String), EmailError> {
    let html = PasswordResetEmailHtml {
        name: &message.name,
        reset_url: &message.reset_url,
        ttl_minutes: message.ttl_minutes,
    }
    .render()?;
    let text = PasswordResetEmailText {
        name: &message.name,
        reset_url: &message.reset_url,
        ttl_minutes: message.ttl_minutes,
    }
    .render()?;
    Ok((html, text))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn message() -> PasswordResetMessage {
        PasswordResetMessage {
            name: "Sam".to_string(),
            reset_url: "http://localhost:3000/reset-password/abc123".to_string(),
            ttl_minutes: 60,
        }
    }

    #[test]
    fn test_templates_include_link_and_expiry() {
        let (html, text) = render_password_reset(&message()).unwrap();
        assert!(html.contains("abc123"));
        assert!(text.contains("http://localhost:3000/reset-password/abc123"));
        assert!(text.contains("60 minutes"));
        assert!(html.contains("Hi Sam,"));
    }

    #[test]
    fn test_debug_redacts_link() {
        let debug = format!("{:?}", message());
        assert!(!debug.contains("abc123"));
    }

    #[tokio::test]
    async fn test_log_notifier_succeeds() {
        let to = Email::parse("sam@example.com").unwrap();
        assert!(LogNotifier.send_password_reset(&to, &message()).await.is_ok());
    }
}
