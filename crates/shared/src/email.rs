//! Email service for sending transactional emails.
//!
//! Uses `lettre` for SMTP transport.

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor, message::header::ContentType,
    transport::smtp::authentication::Credentials,
};
use thiserror::Error;

use crate::config::EmailConfig;
use crate::types::TenantId;

/// Email service errors.
#[derive(Debug, Error)]
pub enum EmailError {
    /// Failed to build email message.
    #[error("Failed to build email: {0}")]
    BuildError(String),
    /// Failed to send email.
    #[error("Failed to send email: {0}")]
    SendError(String),
    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

/// Email service for sending transactional emails.
#[derive(Debug, Clone)]
pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    /// Creates a new email service.
    #[must_use]
    pub const fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn create_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, EmailError> {
        let creds = Credentials::new(
            self.config.smtp_username.clone(),
            self.config.smtp_password.clone(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.smtp_host)
            .map_err(|e| EmailError::SendError(e.to_string()))?
            .port(self.config.smtp_port)
            .credentials(creds)
            .build();
        Ok(transport)
    }

    /// Builds the portal URL a parent follows to redeem a magic link.
    #[must_use]
    pub fn magic_link_url(&self, tenant_id: TenantId, token: &str) -> String {
        format!(
            "{}/auth/magic?tenant={tenant_id}&token={token}",
            self.config.frontend_url.trim_end_matches('/')
        )
    }

    /// Sends a passwordless sign-in link to a parent.
    ///
    /// # Errors
    ///
    /// Returns an error if the email cannot be sent.
    pub async fn send_magic_link(
        &self,
        to_email: &str,
        to_name: &str,
        nursery_name: &str,
        tenant_id: TenantId,
        token: &str,
        ttl_minutes: i64,
    ) -> Result<(), EmailError> {
        let link = self.magic_link_url(tenant_id, token);

        let subject = format!("Your sign-in link for {nursery_name}");
        let body = format!(
            r"Hi {to_name},

Use the link below to sign in to the {nursery_name} parent portal:

{link}

The link works once and expires in {ttl_minutes} minutes.

If you didn't ask to sign in, you can safely ignore this email."
        );

        self.send_email(to_email, &subject, &body).await
    }

    /// Sends a generic email.
    ///
    /// # Errors
    ///
    /// Returns an error if the email cannot be sent.
    pub async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), EmailError> {
        let from = format!("{} <{}>", self.config.from_name, self.config.from_email);

        let email = Message::builder()
            .from(
                from.parse()
                    .map_err(|e| EmailError::InvalidAddress(format!("{e}")))?,
            )
            .to(to_email
                .parse()
                .map_err(|e| EmailError::InvalidAddress(format!("{e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| EmailError::BuildError(e.to_string()))?;

        let transport = self.create_transport()?;
        transport
            .send(email)
            .await
            .map_err(|e| EmailError::SendError(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic_link_url_embeds_tenant_and_token() {
        let service = EmailService::new(EmailConfig {
            frontend_url: "https://portal.example.com/".to_string(),
            ..EmailConfig::default()
        });
        let tenant = TenantId::new();
        let url = service.magic_link_url(tenant, "abc123");
        assert_eq!(
            url,
            format!("https://portal.example.com/auth/magic?tenant={tenant}&token=abc123")
        );
    }

    #[tokio::test]
    async fn test_invalid_recipient_is_rejected_before_sending() {
        let service = EmailService::new(EmailConfig::default());
        let result = service.send_email("not an address", "subject", "body").await;
        assert!(matches!(result, Err(EmailError::InvalidAddress(_))));
    }
}
