//! services/api/src/adapters/mailer.rs
//!
//! SMTP implementation of the `MailService` port using `lettre`'s async
//! transport on the tokio runtime.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use shop_core::ports::{MailService, PortError, PortResult};

use crate::config::SmtpConfig;

const OTP_SUBJECT: &str = "Your verification code";

#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, PortError> {
        let from = config
            .from
            .parse::<Mailbox>()
            .map_err(|e| PortError::Unexpected(format!("invalid sender address: {}", e)))?;
        let credentials = Credentials::new(config.username.clone(), config.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| PortError::Unexpected(format!("smtp relay: {}", e)))?
            .port(config.port)
            .credentials(credentials)
            .build();
        Ok(Self { transport, from })
    }
}

pub(crate) fn otp_body(otp: &str) -> String {
    format!(
        "Your one-time verification code is {}.\n\nIt expires in 5 minutes. \
         If you did not request it, you can ignore this email.",
        otp
    )
}

#[async_trait]
impl MailService for SmtpMailer {
    #[tracing::instrument(skip(self, otp))]
    async fn send_otp(&self, to: &str, otp: &str) -> PortResult<()> {
        let recipient = to
            .parse::<Mailbox>()
            .map_err(|e| PortError::BadRequest(format!("invalid email address: {}", e)))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject(OTP_SUBJECT)
            .header(ContentType::TEXT_PLAIN)
            .body(otp_body(otp))
            .map_err(|e| PortError::Unexpected(format!("failed to build email: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| PortError::Unexpected(format!("failed to send email: {}", e)))?;
        Ok(())
    }
}
