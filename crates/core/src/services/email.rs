//! Email service.
//!
//! Sends mail over SMTP when configured. Without configuration, messages are
//! logged instead, so development setups need no mail server.

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use mentorconnect_common::{AppError, AppResult, config::EmailSettings};

/// Email message to be sent.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    /// Recipient email address
    pub to: String,
    /// Subject line
    pub subject: String,
    /// Plain text body
    pub text_body: String,
}

struct SmtpSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

/// Email service.
#[derive(Clone)]
pub struct EmailService {
    sender: Option<std::sync::Arc<SmtpSender>>,
    server_url: String,
}

impl EmailService {
    /// Create a new email service.
    pub fn new(settings: Option<&EmailSettings>, server_url: &str) -> AppResult<Self> {
        let sender = settings.map(build_sender).transpose()?;

        Ok(Self {
            sender: sender.map(std::sync::Arc::new),
            server_url: server_url.trim_end_matches('/').to_string(),
        })
    }

    /// Email service that only logs.
    #[must_use]
    pub fn log_only(server_url: &str) -> Self {
        Self {
            sender: None,
            server_url: server_url.trim_end_matches('/').to_string(),
        }
    }

    /// Check if SMTP delivery is enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    /// Send an email.
    pub async fn send(&self, message: EmailMessage) -> AppResult<()> {
        let Some(sender) = &self.sender else {
            tracing::info!(
                to = %message.to,
                subject = %message.subject,
                body = %message.text_body,
                "Email delivery not configured, logging message"
            );
            return Ok(());
        };

        let to: Mailbox = message
            .to
            .parse()
            .map_err(|e| AppError::BadRequest(format!("Invalid recipient address: {e}")))?;

        let email = Message::builder()
            .from(sender.from.clone())
            .to(to)
            .subject(message.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(message.text_body)
            .map_err(|e| AppError::Email(format!("Failed to build email: {e}")))?;

        sender
            .transport
            .send(email)
            .await
            .map_err(|e| AppError::Email(format!("SMTP delivery failed: {e}")))?;

        tracing::info!(to = %message.to, "Email sent");
        Ok(())
    }

    /// Link that confirms the address owning `token`.
    #[must_use]
    pub fn verification_link(&self, token: &str) -> String {
        format!(
            "{}/api/account/email/confirm?token={}",
            self.server_url,
            urlencoding::encode(token)
        )
    }

    /// Send the email verification link.
    pub async fn send_verification(&self, to: &str, username: &str, token: &str) -> AppResult<()> {
        let link = self.verification_link(token);
        let text_body = format!(
            "Hi {username},\n\n\
            Please confirm your email address for MentorConnect by opening this link:\n{link}\n\n\
            If you did not request this, you can ignore this email."
        );

        self.send(EmailMessage {
            to: to.to_string(),
            subject: "Confirm your email address".to_string(),
            text_body,
        })
        .await
    }
}

fn build_sender(settings: &EmailSettings) -> AppResult<SmtpSender> {
    let from = format!("{} <{}>", settings.from_name, settings.from_address)
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid sender address: {e}")))?;

    let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.smtp_host)
        .map_err(|e| AppError::Config(format!("Invalid SMTP host: {e}")))?
        .port(settings.smtp_port);

    if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
        builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
    }

    Ok(SmtpSender {
        transport: builder.build(),
        from,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_link() {
        let service = EmailService::log_only("https://mentorconnect.example/");
        assert_eq!(
            service.verification_link("abc 123"),
            "https://mentorconnect.example/api/account/email/confirm?token=abc%20123"
        );
    }

    #[tokio::test]
    async fn test_log_only_send_succeeds() {
        let service = EmailService::new(None, "http://localhost:8000").unwrap();
        assert!(!service.is_enabled());

        service
            .send_verification("a@example.com", "alice", "tok")
            .await
            .unwrap();
    }

    #[test]
    fn test_invalid_sender_rejected() {
        let settings = EmailSettings {
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: 587,
            username: None,
            password: None,
            from_address: "not an address".to_string(),
            from_name: "MentorConnect".to_string(),
        };

        assert!(matches!(
            EmailService::new(Some(&settings), "http://localhost:8000"),
            Err(AppError::Config(_))
        ));
    }
}
