use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};
use std::{env, sync::Arc};

use crate::services::magic_link_service::MAGIC_LINK_MAX_AGE_MINUTES;

pub const MAGIC_LINK_SUBJECT: &str = "Log in to Pantry Recipes";

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Failed to build email message: {0}")]
    MessageBuild(String),
    #[error("Failed to send email: {0}")]
    SendFailed(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

#[async_trait]
pub trait EmailService: Send + Sync {
    async fn send_magic_link_email(&self, to_email: &str, link: &str) -> Result<(), EmailError>;
}

/// Writes magic links to the log instead of sending them.
#[derive(Default)]
pub struct MockEmailService;

impl MockEmailService {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EmailService for MockEmailService {
    async fn send_magic_link_email(&self, to_email: &str, link: &str) -> Result<(), EmailError> {
        tracing::info!("[MOCK EMAIL] Magic link to: {}", to_email);
        tracing::info!("   Subject: {}", MAGIC_LINK_SUBJECT);
        tracing::info!("   Magic link: {}", link);
        Ok(())
    }
}

pub struct SmtpEmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_email: String,
    from_name: String,
}

impl SmtpEmailService {
    pub fn new() -> Result<Self, EmailError> {
        let smtp_host = env::var("SMTP_HOST")
            .map_err(|_| EmailError::ConfigError("SMTP_HOST not set".to_string()))?;
        let smtp_port = env::var("SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse::<u16>()
            .map_err(|_| EmailError::ConfigError("Invalid SMTP_PORT".to_string()))?;
        let smtp_username = env::var("SMTP_USERNAME")
            .map_err(|_| EmailError::ConfigError("SMTP_USERNAME not set".to_string()))?;
        let smtp_password = env::var("SMTP_PASSWORD")
            .map_err(|_| EmailError::ConfigError("SMTP_PASSWORD not set".to_string()))?;
        let from_email = env::var("SMTP_FROM_EMAIL")
            .map_err(|_| EmailError::ConfigError("SMTP_FROM_EMAIL not set".to_string()))?;
        let from_name = env::var("SMTP_FROM_NAME").unwrap_or_else(|_| "Pantry Recipes".to_string());

        let encryption = env::var("SMTP_ENCRYPTION").unwrap_or_else(|_| "starttls".to_string());

        let credentials = Credentials::new(smtp_username, smtp_password);

        let mailer = match encryption.to_lowercase().as_str() {
            "tls" => AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp_host)
                .map_err(|e| EmailError::ConfigError(format!("SMTP relay error: {}", e)))?
                .port(smtp_port)
                .credentials(credentials)
                .build(),
            "starttls" => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp_host)
                .map_err(|e| EmailError::ConfigError(format!("SMTP starttls error: {}", e)))?
                .port(smtp_port)
                .credentials(credentials)
                .build(),
            "none" => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&smtp_host)
                .port(smtp_port)
                .credentials(credentials)
                .build(),
            _ => {
                return Err(EmailError::ConfigError(format!(
                    "Invalid SMTP_ENCRYPTION value: {}. Use 'tls', 'starttls', or 'none'",
                    encryption
                )))
            }
        };

        Ok(Self {
            mailer,
            from_email,
            from_name,
        })
    }
}

pub fn magic_link_email_body(link: &str) -> String {
    format!(
        r#"
<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
</head>
<body style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h1 style="color: #333;">Log in to Pantry Recipes</h1>
    <p>Click the button below to log in. The link only works in the browser you requested it from.</p>
    <p style="text-align: center; margin: 30px 0;">
        <a href="{link}" style="background-color: #2e7d32; color: white; padding: 12px 24px; text-decoration: none; border-radius: 4px; display: inline-block;">Log In</a>
    </p>
    <p style="color: #666; font-size: 14px;">Or copy and paste this link into your browser:</p>
    <p style="color: #666; font-size: 14px; word-break: break-all;">{link}</p>
    <p style="color: #999; font-size: 12px; margin-top: 40px;">This link expires in {minutes} minutes. If you didn't request it, you can ignore this email.</p>
</body>
</html>
"#,
        link = link,
        minutes = MAGIC_LINK_MAX_AGE_MINUTES
    )
}

#[async_trait]
impl EmailService for SmtpEmailService {
    async fn send_magic_link_email(&self, to_email: &str, link: &str) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                format!("{} <{}>", self.from_name, self.from_email)
                    .parse()
                    .map_err(|e| {
                        EmailError::MessageBuild(format!("Invalid from address: {}", e))
                    })?,
            )
            .to(to_email
                .parse()
                .map_err(|e| EmailError::MessageBuild(format!("Invalid to address: {}", e)))?)
            .subject(MAGIC_LINK_SUBJECT)
            .header(ContentType::TEXT_HTML)
            .body(magic_link_email_body(link))
            .map_err(|e| EmailError::MessageBuild(e.to_string()))?;

        self.mailer
            .send(email)
            .await
            .map_err(|e| EmailError::SendFailed(e.to_string()))?;

        tracing::info!("Sent magic link email to {}", to_email);
        Ok(())
    }
}

/// SMTP in production when `SMTP_HOST` is set and valid, otherwise the
/// logging mailer.
pub fn create_email_service(is_production: bool) -> Arc<dyn EmailService> {
    if !is_production {
        tracing::info!("Non-production environment. Magic links will be logged, not sent");
        return Arc::new(MockEmailService::new());
    }

    if env::var("SMTP_HOST").is_err() {
        tracing::warn!("SMTP not configured in production. Magic links will only be logged");
        return Arc::new(MockEmailService::new());
    }

    match SmtpEmailService::new() {
        Ok(service) => {
            tracing::info!("Using SMTP email service");
            Arc::new(service)
        }
        Err(e) => {
            tracing::warn!(
                "Failed to initialize SMTP email service: {}. Falling back to mock service",
                e
            );
            Arc::new(MockEmailService::new())
        }
    }
}
