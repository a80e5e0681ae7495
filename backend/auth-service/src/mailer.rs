use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::MailConfig;
use crate::error::{AppError, AppResult};

/// Delivers one-time codes by e-mail.
#[async_trait]
pub trait CodeSender: Send + Sync {
    async fn send_verification(&self, to: &str, code: &str) -> AppResult<()>;
    async fn send_admin_code(&self, to: &str, code: &str) -> AppResult<()>;
}

/// SMTP mailer. When no host is configured it degrades to a no-op so dev
/// environments run without mail infrastructure.
pub struct SmtpMailer {
    transport: Option<Arc<AsyncSmtpTransport<Tokio1Executor>>>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> AppResult<Self> {
        let from = config
            .from
            .parse::<Mailbox>()
            .map_err(|e| AppError::Config(format!("invalid MAIL_FROM address: {e}")))?;

        let transport = if config.smtp_host.trim().is_empty() {
            tracing::warn!("SMTP host not configured; outgoing mail is disabled");
            None
        } else {
            let mut builder =
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
                    .port(config.smtp_port);
            if let (Some(user), Some(pass)) = (&config.smtp_username, &config.smtp_password) {
                builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
            }
            Some(Arc::new(builder.build()))
        };

        Ok(Self { transport, from })
    }

    async fn send(&self, to: &str, subject: &str, body: String) -> AppResult<()> {
        let Some(transport) = &self.transport else {
            tracing::info!(%to, %subject, "mail transport disabled, dropping message");
            return Ok(());
        };
        let message = Message::builder()
            .from(self.from.clone())
            .to(to
                .parse::<Mailbox>()
                .map_err(|e| AppError::BadRequest(format!("invalid recipient: {e}")))?)
            .subject(subject)
            .body(body)
            .map_err(|e| AppError::Internal(format!("build mail: {e}")))?;
        transport
            .send(message)
            .await
            .map_err(|e| AppError::Internal(format!("send mail: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl CodeSender for SmtpMailer {
    async fn send_verification(&self, to: &str, code: &str) -> AppResult<()> {
        self.send(
            to,
            "Your Courier verification code",
            format!("Your Courier verification code: {code}\nIt expires in 15 minutes."),
        )
        .await
    }

    async fn send_admin_code(&self, to: &str, code: &str) -> AppResult<()> {
        self.send(
            to,
            "Courier admin sign-in code",
            format!("Security code for the Courier admin panel: {code}\nIt expires in 10 minutes."),
        )
        .await
    }
}
