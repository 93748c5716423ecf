use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

use crate::config::SmtpConfig;

/// Outbound account email. Both calls fail loudly on transport errors.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_verification(&self, to: &str, token: &str) -> anyhow::Result<()>;
    async fn send_reset(&self, to: &str, token: &str) -> anyhow::Result<()>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
    public_base_url: String,
}

impl SmtpMailer {
    pub fn new(cfg: &SmtpConfig, public_base_url: &str) -> Self {
        // plain SMTP relay (mailhog in dev, a local MTA in prod)
        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&cfg.host).port(cfg.port);
        if let (Some(user), Some(pass)) = (&cfg.username, &cfg.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }
        Self {
            transport: builder.build(),
            from: cfg.from.clone(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn send(&self, to: &str, subject: &str, body: String) -> anyhow::Result<()> {
        let email = Message::builder()
            .from(self.from.parse().context("invalid from address")?)
            .to(to.parse().context("invalid to address")?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .context("build email")?;

        self.transport.send(email).await.context("smtp send")?;
        info!(subject, "email sent");
        Ok(())
    }
}

pub fn verification_link(base: &str, token: &str) -> String {
    format!("{}/auth/verify?token={}", base, token)
}

pub fn reset_link(base: &str, token: &str) -> String {
    format!("{}/auth/reset-password?token={}", base, token)
}

#[async_trait]
impl EmailSender for SmtpMailer {
    async fn send_verification(&self, to: &str, token: &str) -> anyhow::Result<()> {
        let link = verification_link(&self.public_base_url, token);
        self.send(to, "Verify your email", format!("Click to verify: {link}"))
            .await
    }

    async fn send_reset(&self, to: &str, token: &str) -> anyhow::Result<()> {
        let link = reset_link(&self.public_base_url, token);
        self.send(
            to,
            "Reset your password",
            format!("Click to reset your password: {link}"),
        )
        .await
    }
}
