use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};

use crate::config::Config;

/// Fire-and-forget mail sender. Delivery failures are logged and reported
/// as `false`; nothing in the booking or chat flows depends on the result.
#[derive(Debug, Clone)]
pub struct Mailer {
    from: String,
    smtp_host: String,
    smtp_username: String,
    smtp_password: String,
}

impl Mailer {
    pub fn new(config: &Config) -> Self {
        Mailer {
            from: config.mail_from.clone(),
            smtp_host: config.smtp_host.clone(),
            smtp_username: config.smtp_username.clone(),
            smtp_password: config.smtp_password.clone(),
        }
    }

    pub async fn send(&self, to: &str, subject: &str, body: &str) -> bool {
        let email = match Message::builder()
            .from(match self.from.parse() {
                Ok(mailbox) => mailbox,
                Err(e) => {
                    tracing::error!("Invalid sender address {}: {}", self.from, e);
                    return false;
                }
            })
            .to(match to.parse() {
                Ok(mailbox) => mailbox,
                Err(e) => {
                    tracing::error!("Invalid recipient address {}: {}", to, e);
                    return false;
                }
            })
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
        {
            Ok(email) => email,
            Err(e) => {
                tracing::error!("Failed to build email to {}: {}", to, e);
                return false;
            }
        };

        let creds = Credentials::new(self.smtp_username.clone(), self.smtp_password.clone());
        let mailer = match AsyncSmtpTransport::<Tokio1Executor>::relay(&self.smtp_host) {
            Ok(builder) => builder.credentials(creds).build(),
            Err(e) => {
                tracing::error!("Failed to build SMTP transport: {}", e);
                return false;
            }
        };

        match mailer.send(email).await {
            Ok(_) => {
                tracing::info!("Email sent to {}: {}", to, subject);
                true
            }
            Err(e) => {
                tracing::warn!("Failed to send email to {}: {}", to, e);
                false
            }
        }
    }
}
