use async_trait::async_trait;
use lettre::{
    Message, SmtpTransport, Transport,
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
};
use std::sync::{Arc, Mutex};

use crate::{
    config::SmtpSettings,
    error::{AppError, AppResult},
};

/// EmailMessage
///
/// A single outgoing HTML email.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub content: String,
}

// 1. EmailService Contract
/// EmailService
///
/// Abstract contract for outgoing mail. The auth flow depends only on this trait,
/// so the SMTP relay (`SmtpEmailService`) can be swapped for the recording
/// `MockEmailService` in local runs and tests.
#[async_trait]
pub trait EmailService: Send + Sync {
    async fn send(&self, message: EmailMessage) -> AppResult<()>;
}

pub type EmailState = Arc<dyn EmailService>;

// 2. The Real Implementation (SMTP over implicit TLS)
/// SmtpEmailService
///
/// Delivers through the configured relay using lettre's blocking transport.
/// Each send runs on the blocking thread pool so the SMTP handshake never
/// stalls the async executor.
#[derive(Clone)]
pub struct SmtpEmailService {
    mailer: SmtpTransport,
    from: String,
}

impl SmtpEmailService {
    /// new
    ///
    /// Builds the relay transport from `SmtpSettings`. Fails if the host is not a
    /// valid relay name.
    pub fn new(settings: &SmtpSettings) -> AppResult<Self> {
        let mailer = SmtpTransport::relay(&settings.host)
            .map_err(|e| AppError::Email(format!("invalid SMTP relay: {e}")))?
            .port(settings.port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .build();

        Ok(Self {
            mailer,
            from: settings.from.clone(),
        })
    }
}

#[async_trait]
impl EmailService for SmtpEmailService {
    async fn send(&self, message: EmailMessage) -> AppResult<()> {
        let email = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| AppError::Email(format!("invalid sender address: {e}")))?,
            )
            .to(message
                .to
                .parse()
                .map_err(|e| AppError::Email(format!("invalid recipient address: {e}")))?)
            .subject(message.subject)
            .header(ContentType::TEXT_HTML)
            .body(message.content)
            .map_err(|e| AppError::Email(e.to_string()))?;

        let mailer = self.mailer.clone();
        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::Internal(format!("email task failed: {e}")))?
            .map_err(|e| AppError::Email(e.to_string()))?;

        tracing::info!(to = %message.to, "email sent");
        Ok(())
    }
}

// 3. The Mock Implementation (local runs and tests)
/// MockEmailService
///
/// Records every message instead of delivering it and logs the content, which is
/// how OTP codes reach a developer when no relay is configured.
#[derive(Clone, Default)]
pub struct MockEmailService {
    /// When true, every send fails with an email error.
    pub should_fail: bool,
    sent: Arc<Mutex<Vec<EmailMessage>>>,
}

impl MockEmailService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Messages recorded so far, oldest first.
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl EmailService for MockEmailService {
    async fn send(&self, message: EmailMessage) -> AppResult<()> {
        if self.should_fail {
            return Err(AppError::Email("simulated delivery failure".into()));
        }

        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            content = %message.content,
            "email captured (not delivered)"
        );
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message);
        }
        Ok(())
    }
}
