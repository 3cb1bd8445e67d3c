use anyhow::{Context, Result};
use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

/// Async SMTP mailer. Optional at runtime; endpoints that need mail
/// report upstream failure when it is not configured.
#[derive(Debug, Clone)]
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl Mailer {
    pub fn new(host: &str, username: &str, password: &str, from: &str) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .context("invalid SMTP relay host")?
            .credentials(Credentials::new(username.to_owned(), password.to_owned()))
            .build();
        let from = from
            .parse::<Mailbox>()
            .context("invalid SMTP from address")?;
        Ok(Self { transport, from })
    }

    pub async fn send_password_reset(&self, to: &str, reset_url: &str) -> Result<()> {
        let to_mailbox = to
            .parse::<Mailbox>()
            .context("invalid recipient address")?;
        let body = format!(
            "Someone requested a password reset for your account.\n\n\
             Open this link within 15 minutes to choose a new password:\n\n\
             {reset_url}\n\n\
             If this wasn't you, ignore this email.\n"
        );
        let message = Message::builder()
            .from(self.from.clone())
            .to(to_mailbox)
            .subject("Reset your password")
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .context("failed to build reset email")?;

        self.transport
            .send(message)
            .await
            .context("SMTP send failed")?;
        info!("Password reset email sent to {}", to);
        Ok(())
    }
}
